//! Skin undertone and tone classification behind a small HTTP API.
//!
//! An uploaded face image is sampled for skin-coloured pixels, classified into
//! an undertone (warm, cool or neutral) and matched against an ordered tone
//! palette. The two labels select a product recommendation.

pub mod api;
pub mod artifacts;
pub mod color;
pub mod config;
pub mod error;
pub mod model;
pub mod palette;
pub mod recommendation;
pub mod skin;

pub use api::{router, AppState, PredictResponse};
pub use config::Config;
pub use model::{TonePrediction, Undertone, UndertonePredictor};
pub use palette::TonePalette;
pub use recommendation::{Recommendation, RecommendationTable};
