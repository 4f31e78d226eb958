//! Scoring, ranking, diagnosis, and explanation for receipt reconciliation.
//!
//! The pipeline runs in four synchronous, stateless stages:
//!
//! ```text
//! receipt + rows -> score -> rank::find_matches -> diagnose::diagnose -> explain
//! ```
//!
//! No stage performs I/O and no public entry point panics; failure always
//! degrades to a valid result with explanatory evidence attached.

pub mod diagnose;
pub mod explain;
pub mod rank;
pub mod score;

pub use diagnose::diagnose;
pub use explain::{format_explanation, format_explanation_json};
pub use rank::find_matches;
