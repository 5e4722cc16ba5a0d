//! Configuration module for dntrends.
//!
//! This module provides structured configuration loading from environment variables,
//! organized by concern: Store and Pipeline.

mod pipeline_config;
mod store_config;

pub use pipeline_config::PipelineEnvConfig;
pub use store_config::{STORE_KEY_VAR, STORE_URL_VAR, StoreEnvConfig};

use anyhow::{Context, Result};
use std::env;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreEnvConfig,
    pub pipeline: PipelineEnvConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Fails when the store endpoint or credential is missing, or when a
    /// pipeline setting cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let store = StoreEnvConfig::from_lookup(&lookup).context("Failed to load store config")?;
        let pipeline =
            PipelineEnvConfig::from_lookup(&lookup).context("Failed to load pipeline config")?;
        Ok(Self { store, pipeline })
    }
}
