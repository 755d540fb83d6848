pub mod chunker;
pub mod error;
pub mod event;
pub mod invoker;
pub mod params;
pub mod pipeline;
pub mod request;
pub mod scheduler;
pub mod session;
pub mod worker;

pub use chunker::*;
pub use error::*;
pub use event::*;
pub use invoker::*;
pub use params::{Convention, FeedMode, Param, RuntimeBinding};
pub use pipeline::*;
pub use request::*;
pub use scheduler::*;
pub use session::*;
pub use worker::*;
