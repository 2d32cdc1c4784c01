//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::{RoomDirectory, ServerHandle};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub directory: Arc<RoomDirectory>,
    pub server: ServerHandle,
}

impl AppState {
    pub fn new(config: Config, directory: Arc<RoomDirectory>, server: ServerHandle) -> Self {
        Self {
            config: Arc::new(config),
            directory,
            server,
        }
    }
}
