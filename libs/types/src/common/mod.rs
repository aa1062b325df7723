//! Common types shared by the ledger, venue and distribution crates

pub mod context;
pub mod errors;
pub mod fixed_point;
