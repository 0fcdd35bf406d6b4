#![doc = include_str!("../README.md")]
#![forbid(unsafe_op_in_unsafe_fn)]

mod envelope;
mod fault;
mod header;
mod observe;
mod operation;
mod router;
mod status;
mod transport;

pub use envelope::*;
pub use fault::*;
pub use header::*;
pub use observe::*;
pub use operation::*;
pub use router::*;
pub use status::*;
pub use transport::*;
