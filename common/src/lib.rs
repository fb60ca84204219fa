//! fxhistory Common Types
//!
//! This crate contains the value types shared across fxhistory: currency and
//! provider identifiers, daily exchange-rate records, date ranges and
//! pagination descriptors.

pub mod currency;
pub mod rates;
pub mod pagination;
pub mod error;
pub mod time;

pub use currency::*;
pub use rates::*;
pub use pagination::*;
pub use error::*;
pub use time::*;
