//! The election lifecycle: draft elections in the document store, one-way
//! deployment onto the ledger, and role-scoped reads that reconcile the
//! two.

mod manager;
mod validate;

pub use manager::{DeployOutcome, ElectionManager};
pub use validate::{validate_voters, ValidationOutcome};
