use tokio::sync::broadcast;

use crate::dispatch::RequestEvent;
use crate::observability::metrics::Metrics;
use crate::store::RequestStore;

pub struct AppState {
    pub store: RequestStore,
    pub events_tx: broadcast::Sender<RequestEvent>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(event_buffer_size: usize) -> Self {
        let (events_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        Self {
            store: RequestStore::new(),
            events_tx,
            metrics: Metrics::new(),
        }
    }
}
