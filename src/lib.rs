//! Static token and pool time series: loading, window reduction, an
//! expiring reduction cache, and data-quality checks.

pub mod cache;
pub mod cli;
pub mod dataset;
pub mod error;
pub mod model;
pub mod progress;
pub mod quality;
pub mod render;
pub mod stats;
pub mod utils;
pub mod view;
pub mod window;
