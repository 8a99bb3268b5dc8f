//! Java object serialization
//!
//! The [`model`] types describe an object graph; [`writer`] encodes it as
//! an `ObjectOutputStream` byte stream.

pub mod model;
pub mod suid;
pub mod writer;

pub use model::{
    ArrayElements, ClassDesc, FieldDesc, JavaArray, JavaObject, JavaPrimitive, JavaValue,
};
pub use suid::array_suid;
pub use writer::{ObjectStreamWriter, serialize};
