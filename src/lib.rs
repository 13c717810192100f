//! Simple to use cli for tracking your personal carbon footprint.
//! Activities are logged against a table of emission factors, kept in a local
//! snapshot, and summarized as a daily gauge and a weekly per-category
//! breakdown.
//!

pub mod cli;
pub mod factors;
pub mod store;
pub mod utils;
