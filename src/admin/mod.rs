//! Admin operation object model.
//!
//! Commands are plain owned values validated at construction; results are
//! wrapped in [`AdminResult`], which separates a request-level error from
//! the per-item errors carried by each result element. Every call ends with
//! exactly one [`AdminEvent`] posted to a [`ResultQueue`](crate::queue::ResultQueue).

mod acl;
mod config;
mod event;
mod group;
mod options;
mod result;
mod scram;
mod topic;

pub use acl::*;
pub use config::*;
pub use event::*;
pub use group::*;
pub use options::*;
pub use result::*;
pub use scram::*;
pub use topic::*;
