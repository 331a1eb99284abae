pub mod aggregation;
pub mod fallback;
pub mod ranking;
pub mod recommendation;
pub mod signals;

pub use aggregation::{aggregate, Aggregate, ScoreMap};
pub use fallback::FallbackFiller;
pub use ranking::{Ranker, RankedItems};
pub use recommendation::RecommendationEngine;
pub use signals::{SignalCollector, SignalContext, SignalLayer, SignalScores};
