pub mod api;
pub mod config;
pub mod engine;
pub mod store;

use config::Config;
use store::Store;

pub struct AppState {
    pub config: Config,
    pub store: Store,
}

impl AppState {
    pub fn new(config: Config, store: Store) -> Self {
        Self { config, store }
    }
}
