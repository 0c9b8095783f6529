//! Event loop that connects a [`SearchSession`] to a transport and a view.

use super::session::{NavKey, SearchSession};
use super::transport::SearchTransport;
use crate::config::ClientConfig;
use crate::protocol::SearchResult;
use crate::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

/// Input from the search surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// The text box now holds this text.
    Input(String),
    Key(NavKey),
    /// The surface was dismissed.
    Close,
}

/// Receives the session after every visible change.
pub trait ClientView: Send {
    fn render(&mut self, session: &SearchSession);
}

type SearchReply = (u64, Result<Vec<SearchResult>>);

/// Drives one search surface until its event channel closes.
pub struct SearchClient<T, V> {
    session: SearchSession,
    transport: Arc<T>,
    view: V,
    debounce: Duration,
}

impl<T, V> SearchClient<T, V>
where
    T: SearchTransport + 'static,
    V: ClientView,
{
    pub fn new(transport: Arc<T>, view: V) -> Self {
        Self {
            session: SearchSession::new(),
            transport,
            view,
            debounce: ClientConfig::DEBOUNCE_WINDOW,
        }
    }

    /// Override the quiet period before a query is sent.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn session(&self) -> &SearchSession {
        &self.session
    }

    /// Process events until the sender side is dropped. Returns the view.
    pub async fn run(mut self, mut events: mpsc::Receiver<ClientEvent>) -> V {
        let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<SearchReply>();
        let mut deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else { break };
                    match event {
                        ClientEvent::Input(text) => {
                            self.session.set_input(text);
                            deadline = Some(Instant::now() + self.debounce);
                        }
                        ClientEvent::Key(NavKey::Confirm) => {
                            if let Some(request) = self.session.confirm() {
                                deadline = None;
                                self.view.render(&self.session);
                                if let Err(e) = self.transport.goto(&request).await {
                                    warn!("goto {} failed: {}", request.note_id, e);
                                }
                            }
                        }
                        ClientEvent::Key(key) => {
                            self.session.move_selection(key);
                            self.view.render(&self.session);
                        }
                        ClientEvent::Close => {
                            deadline = None;
                            self.session.close();
                            self.view.render(&self.session);
                        }
                    }
                }
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    deadline = None;
                    if let Some(request) = self.session.begin_query() {
                        debug!("search #{}: {:?}", request.seq, request.query);
                        let transport = self.transport.clone();
                        let reply_tx = reply_tx.clone();
                        tokio::spawn(async move {
                            let result = transport.search(&request.query).await;
                            let _ = reply_tx.send((request.seq, result));
                        });
                    }
                    self.view.render(&self.session);
                }
                Some((seq, result)) = reply_rx.recv() => {
                    let applied = match result {
                        Ok(results) => self.session.apply_results(seq, results),
                        Err(e) => {
                            warn!("search #{} failed: {}", seq, e);
                            self.session.apply_failure(seq)
                        }
                    };
                    if applied {
                        self.view.render(&self.session);
                    } else {
                        debug!("Dropped stale response #{}", seq);
                    }
                }
            }
        }

        self.view
    }
}

/// Spawn a client on the runtime and return its event sender.
pub fn spawn_client<T, V>(
    client: SearchClient<T, V>,
) -> (mpsc::Sender<ClientEvent>, tokio::task::JoinHandle<V>)
where
    T: SearchTransport + 'static,
    V: ClientView + 'static,
{
    let (tx, rx) = mpsc::channel(ClientConfig::EVENT_CHANNEL_CAPACITY);
    let handle = tokio::spawn(client.run(rx));
    (tx, handle)
}
