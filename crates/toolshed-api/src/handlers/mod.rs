//! HTTP API handlers — thin adapters from JSON requests to the orchestrator.

pub mod chat;
pub mod media;
pub mod status;

use std::sync::Arc;

use toolshed_services::Orchestrator;

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<Orchestrator>,
}

impl ApiState {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
        }
    }
}

// Re-export handler functions for use in router setup.
pub use chat::handle_chat;
pub use media::{handle_media_download, handle_media_info};
pub use status::handle_status;
