//! Request builders for the admin APIs.
//!
//! Each request type owns the command it serializes and implements
//! [`ProtocolRequest`](super::ProtocolRequest). Builders branch only on the
//! fields that differ between versions and write them in schema order.

mod acls;
mod configs;
mod groups;
mod offsets;
mod scram;
mod topics;
mod versions;

pub use acls::*;
pub use configs::*;
pub use groups::*;
pub use offsets::*;
pub use scram::*;
pub use topics::*;
pub use versions::*;
