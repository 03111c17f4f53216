//! Storage contracts consumed by the sync engine, plus in-memory and sea-orm
//! implementations.
//!
//! The engine only needs four issue operations and two connection operations;
//! everything else about persistence belongs to the host application.

mod database;
mod errors;
mod memory;
mod traits;

pub use database::DatabaseStore;
pub use errors::{Result, StoreError};
pub use memory::{MemoryConnectionStore, MemoryIssueStore};
pub use traits::{ConnectionStore, IssuePatch, IssueStore, NewConnection, NewIssue};
