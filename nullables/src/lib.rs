//! In-process stand-ins for the marketplace's outside world.
//!
//! [`NullStore`] keeps every table in memory and can be flipped into an
//! outage. [`NullClock`] only moves when a test moves it.
//! [`NullBalanceOracle`] and [`NullPaymentVerifier`] answer from scripted
//! balances and confirmed references, and count how often they were asked.

pub mod chain;
pub mod clock;
pub mod store;

pub use chain::{NullBalanceOracle, NullPaymentVerifier};
pub use clock::NullClock;
pub use store::NullStore;
