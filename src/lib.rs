pub mod aggregator;
pub mod classify;
pub mod debounce;
pub mod geometry;
pub mod gesture;
pub mod logging;
pub mod overlay;
pub mod service;
pub mod settings;
pub mod snapshot;
