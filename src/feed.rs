//! Client-side loading state for the animal list.
//!
//! An [`AnimalFeed`] fetches the list, optionally filtered by type, from
//! any [`Repository`] and publishes `Loading`, `Ready` or `Failed` through
//! a watch channel. Each fetch takes a ticket when it starts; a result is
//! only published if no newer fetch has started and the feed has not been
//! unmounted since, so slow responses never overwrite fresher state.

use std::sync::Arc;

use log::{debug, error, Logger};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::client::ClientAnimal;
use crate::environment::SafeRepository;

#[derive(Clone, Debug, PartialEq)]
pub enum FeedState {
    Loading,
    Ready(Vec<ClientAnimal>),
    Failed(String),
}

/// The published state, tagged with the ticket of the fetch that is
/// allowed to replace it.
#[derive(Clone, Debug)]
pub struct Snapshot {
    ticket: u64,
    state: FeedState,
}

impl Snapshot {
    pub fn state(&self) -> &FeedState {
        &self.state
    }
}

struct Shared {
    service: Arc<SafeRepository>,
    logger: Arc<Logger>,
    sender: watch::Sender<Snapshot>,
}

pub struct AnimalFeed {
    shared: Arc<Shared>,
    receiver: watch::Receiver<Snapshot>,
    filter: Option<String>,
}

impl AnimalFeed {
    /// Creates the feed and starts the first fetch. An empty filter means
    /// every animal.
    pub fn mount(
        service: Arc<SafeRepository>,
        logger: Arc<Logger>,
        filter: Option<String>,
    ) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = watch::channel(Snapshot {
            ticket: 0,
            state: FeedState::Loading,
        });

        let feed = AnimalFeed {
            shared: Arc::new(Shared {
                service,
                logger,
                sender,
            }),
            receiver,
            filter: normalize(filter),
        };
        let fetch = feed.fetch();

        (feed, fetch)
    }

    pub fn state(&self) -> FeedState {
        self.receiver.borrow().state.clone()
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.receiver.clone()
    }

    /// Switches to another filter and fetches again. Results are never
    /// reused across filters.
    pub fn set_filter(&mut self, filter: Option<String>) -> JoinHandle<()> {
        self.filter = normalize(filter);
        self.fetch()
    }

    /// Fetches again with the current filter, whatever the current state.
    pub fn reload(&self) -> JoinHandle<()> {
        self.fetch()
    }

    /// Stops the feed. Fetches still in flight are discarded when they
    /// finish.
    pub fn unmount(self) {}

    fn fetch(&self) -> JoinHandle<()> {
        let mut ticket = 0;

        self.shared.sender.send_modify(|snapshot| {
            snapshot.ticket += 1;
            snapshot.state = FeedState::Loading;
            ticket = snapshot.ticket;
        });

        let shared = self.shared.clone();
        let filter = self.filter.clone();

        tokio::spawn(async move {
            let result = match &filter {
                Some(tipo) => shared.service.list_by_type(tipo).await,
                None => shared.service.list().await,
            };

            let state = match result {
                Ok(animals) => {
                    FeedState::Ready(animals.into_iter().map(ClientAnimal::from).collect())
                }
                Err(e) => {
                    error!(shared.logger, "Failed to load animals"; "filter" => ?filter, "error" => %e);
                    FeedState::Failed(format!(
                        "There was a problem loading the animals. Please try again. ({})",
                        e
                    ))
                }
            };

            let applied = shared.sender.send_if_modified(|snapshot| {
                if snapshot.ticket == ticket {
                    snapshot.state = state;
                    true
                } else {
                    false
                }
            });

            if !applied {
                debug!(shared.logger, "Discarded stale animal list"; "ticket" => ticket, "filter" => ?filter);
            }
        })
    }
}

impl Drop for AnimalFeed {
    fn drop(&mut self) {
        // outstanding tickets no longer match
        self.shared
            .sender
            .send_modify(|snapshot| snapshot.ticket += 1);
    }
}

fn normalize(filter: Option<String>) -> Option<String> {
    filter.filter(|f| !f.is_empty())
}
