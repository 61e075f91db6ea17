//! Async fetch engine.
//!
//! Owns a tokio runtime and runs one task per dispatched window. The UI loop
//! stays synchronous; completions come back over an unbounded channel that the
//! loop drains every tick. The model's busy flag keeps this to one request in
//! flight; nothing here enforces or queues anything.

use std::sync::Arc;
use std::time::Instant;

use tokio::runtime::Runtime;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, trace};

use crate::api::{FetchOutcome, FetchWindow, ProductSource};
use crate::domain::LtvError;

pub struct Fetcher {
    runtime: Runtime,
    source: Arc<dyn ProductSource>,
    tx: UnboundedSender<FetchOutcome>,
    rx: UnboundedReceiver<FetchOutcome>,
}

impl Fetcher {
    pub fn new(source: Arc<dyn ProductSource>) -> Result<Self, LtvError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        let (tx, rx) = mpsc::unbounded_channel();
        Ok(Fetcher {
            runtime,
            source,
            tx,
            rx,
        })
    }

    pub fn dispatch(&self, window: FetchWindow) {
        trace!("Dispatching window at {}: {:?}", window.first, window.query);
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let started = Instant::now();
            // TODO: put a request timeout on the client; today a hung server
            // keeps the table busy until the connection dies on its own.
            let result = source.fetch_page(&window.query).await;
            let outcome = FetchOutcome {
                window,
                result,
                elapsed_ms: started.elapsed().as_millis(),
            };
            if tx.send(outcome).is_err() {
                debug!("Fetch completed after the UI loop shut down");
            }
        });
    }

    /// Non-blocking drain for the UI loop.
    pub fn try_recv(&mut self) -> Option<FetchOutcome> {
        self.rx.try_recv().ok()
    }
}
