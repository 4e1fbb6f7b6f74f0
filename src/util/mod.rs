//! Utility modules

pub mod units;
