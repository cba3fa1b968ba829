//! Analysis modules.
//!
//! This module holds the lookup / sort / classify pipeline that turns
//! discovered plugins into report rows.

pub mod aggregator;
pub mod dates;

pub use aggregator::*;
pub use dates::parse_last_updated;
