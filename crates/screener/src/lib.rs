//! Screener
//!
//! Pure classification and filtering over stock snapshots: the fire-level
//! ladder, rank-category derivation, the compound filter/sort engine, and
//! scan summary statistics. No I/O; everything here is total over
//! well-typed input.

pub mod classifier;
pub mod filter;

pub use classifier::{fire_level, rank_category};
pub use filter::{apply, summarize, FilterSpec, PriceRange, QualifyRule, ScanSummary};
