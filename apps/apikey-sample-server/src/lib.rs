#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Sample service protected by data-protected API keys.

pub mod config;
pub mod routes;

pub use config::AppConfig;
pub use routes::{SampleKey, SampleOutcomeBuilder, build_router};
