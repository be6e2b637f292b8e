use std::sync::Arc;

use config::Config;
use engine::worker::JourneyDispatcher;

pub mod cache;
pub mod config;
pub mod database;
pub mod engine;
pub mod error;
pub mod geo;
pub mod middleware;
pub mod routes;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub dispatcher: Arc<JourneyDispatcher>,
}
