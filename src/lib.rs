#[cfg(test)]
mod tests;

pub mod config;
pub mod job;
pub mod timing_core;

pub use config::{BackendType, ConfigError, TimingConfig};
pub use job::{JobSummary, TimingJob};
