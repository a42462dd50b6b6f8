//! Adaptive estimation and matchmaking core.
//!
//! Leaf modules are pure (`irt`, `clustering`, `grouping`, `tiers`);
//! `dda` holds per-session state and `engine` owns everything shared.

pub mod clustering;
pub mod config;
pub mod dda;
pub mod engine;
pub mod error;
pub mod grouping;
pub mod irt;
pub mod matchmaker;
pub mod metrics;
pub mod monitoring;
pub mod opponent;
pub mod precision;
pub mod sessions;
pub mod tiers;
pub mod types;

pub use engine::AdaptiveEngine;
pub use error::{EngineError, EngineResult};
