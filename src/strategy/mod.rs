//! Strategy configuration (the tagged sum type) and the simulation engine that consumes it.

pub mod config;
pub mod engine;

pub use config::{ScenarioConfig, SpikeThresholdConfig, StrategyConfig};
pub use engine::{simulate, EngineInput};
