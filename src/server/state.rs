use axum::extract::FromRef;

use crate::background::ProcessRegistry;
use crate::jobs::Pipeline;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedPipeline = Arc<Pipeline>;
pub type GuardedRegistry = Arc<ProcessRegistry>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub pipeline: GuardedPipeline,
    pub registry: GuardedRegistry,
    pub hash: String,
}

impl FromRef<ServerState> for GuardedPipeline {
    fn from_ref(input: &ServerState) -> Self {
        input.pipeline.clone()
    }
}

impl FromRef<ServerState> for GuardedRegistry {
    fn from_ref(input: &ServerState) -> Self {
        input.registry.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
