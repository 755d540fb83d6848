pub mod cli;
pub mod input;
