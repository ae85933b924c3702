use crate::config::Config;
use crate::observability::metrics::Metrics;
use crate::store::Store;

pub struct AppState {
    pub config: Config,
    pub store: Store,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            store: Store::new(),
            metrics: Metrics::new(),
        }
    }
}
