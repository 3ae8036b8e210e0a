//! Store Module
//!
//! Document store boundary and the operation table built on top of it.

mod args;
mod operations;
mod traits;

pub use args::{AggregateArgs, FindOptions, QueryArgs};
pub use operations::{Operations, OPERATION_NAMES};
pub use traits::{DocumentStore, EntityResolver, Filter, PassthroughResolver, StaticResolver};
