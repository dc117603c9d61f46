pub mod geo;
pub mod zones;
pub mod spatial;
pub mod clock;
pub mod demand;
pub mod scoring;
pub mod matching;
pub mod persistence;
pub mod config;
pub mod engine;
pub mod ecs;
pub mod error;
pub mod logging;

#[cfg(feature = "test-helpers")]
pub mod test_helpers;
