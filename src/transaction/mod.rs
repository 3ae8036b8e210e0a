//! Transaction Module
//!
//! Bounded-retry execution of a unit of work inside a store session.

mod retry;
mod scope;

pub use retry::{
    with_transaction, MAX_TRANSACTION_ATTEMPTS, TRANSACTION_DEADLINE, TRANSACTION_METRIC,
};
pub use scope::{SessionProvider, TransactionOptions, TransactionScope};
