pub mod artifact;
pub mod backend;
pub mod binding;
pub mod codec;
pub mod error;
pub mod literal;
pub mod scalar;
pub mod signature;
pub mod tensor;

pub use artifact::*;
pub use backend::*;
pub use binding::{bind, OutputAttribute, OutputSchema, SignatureBinding};
pub use codec::NativeArray;
pub use error::*;
pub use literal::{EncodedArray, TypeTag};
pub use scalar::*;
pub use signature::*;
pub use tensor::*;
