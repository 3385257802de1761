//! # Engine Crate
//!
//! Public API surface of the book recommendation core: the orchestrator
//! owning all entities, indices and both recommender models.

pub mod engine;

pub use engine::{
    DEFAULT_K_NEIGHBORS, DEFAULT_RECOMMENDATION_COUNT, LoadReport, MIN_RATINGS_FOR_CF,
    RecommendationEngine,
};
