pub mod aggregator;
pub mod classifier;
pub mod clock;
pub mod config;
pub mod fetch;
pub mod infra;
pub mod mode;
pub mod model;
pub mod output;
pub mod recency;
pub mod services;
pub mod worker;
