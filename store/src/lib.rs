//! Abstract storage traits for the Souk marketplace.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The rest of the codebase depends only on the traits.
//!
//! Operations that must not interleave with concurrent writers are single
//! trait methods so that each backend can make them atomic:
//! [`TransactionStore::commit_purchase`], [`ListingStore::compare_and_swap`],
//! [`ReportStore::insert_report`] and [`UserStore::update_user`].

pub mod error;
pub mod listing;
pub mod log;
pub mod report;
pub mod transaction;
pub mod user;

pub use error::StoreError;
pub use listing::{ListingRecord, ListingStore};
pub use log::{LogRecord, LogStore};
pub use report::{ReportRecord, ReportStore};
pub use transaction::{PurchaseCommit, PurchaseDraft, TransactionRecord, TransactionStore};
pub use user::{UserRecord, UserStore};

/// Everything the marketplace needs from a backend.
pub trait MarketStore: ListingStore + TransactionStore + UserStore + ReportStore + LogStore {}

impl<T> MarketStore for T where T: ListingStore + TransactionStore + UserStore + ReportStore + LogStore
{}
