//! Ratings and trust scores
//!
//! - [`RatingEngine`] - records directional ratings
//! - [`TrustScoreAggregator`] - recomputes ratee aggregates from the rating ledger

pub mod engine;
pub mod error;
pub mod trust;

pub use engine::RatingEngine;
pub use error::{RatingError, RatingResult};
pub use trust::TrustScoreAggregator;
