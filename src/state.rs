// src/state.rs
use std::sync::Arc;

use crate::config::Config;
use crate::services::upstream::{UpstreamClient, UpstreamError};

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub config: Arc<Config>,
    pub upstream: UpstreamClient,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, UpstreamError> {
        let config = Arc::new(config);
        Ok(Self {
            upstream: UpstreamClient::new(config.clone())?,
            config,
        })
    }
}
