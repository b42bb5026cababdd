pub mod classify;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod merge;
pub mod metrics;
pub mod model;
pub mod moves;
pub mod pipeline;
pub mod util;
