use crate::{
    config::Config,
    websocket::{ChannelRegistry, Dispatcher},
};
use std::sync::Arc;

/// Shared service state
///
/// Built once at startup and handed to every worker through `web::Data`.
/// The dispatcher reads the same registry the WebSocket sessions write.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: ChannelRegistry,
    pub dispatcher: Dispatcher,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let registry = ChannelRegistry::new();
        let dispatcher = Dispatcher::new(registry.clone());
        Self {
            config: Arc::new(config),
            registry,
            dispatcher,
        }
    }

    /// Drop every open channel. Returns how many were removed.
    pub fn shutdown(&self) -> usize {
        let dropped = self.registry.clear();
        tracing::info!(dropped_channels = dropped, "channel registry cleared");
        dropped
    }
}
