//! # Análisis Estadístico
//! src/analytics/mod.rs
//!
//! Dataset cargado una sola vez al arrancar y el motor que calcula los
//! nueve tipos de análisis sobre él.

pub mod dataset;
pub mod engine;

pub use dataset::{Dataset, Record};
pub use engine::{Analytics, Engine, LOWER_IS_BETTER};
