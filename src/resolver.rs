//! First-match-wins resolution of a contact address to a display name.

use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use log::{debug, trace};
use tokio::sync::Notify;

use crate::query::{Candidate, ContactQuery, QueryListener};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Running,
    Stopped,
}

struct Inner {
    state: State,
    /// Held only while `Running`; released on stop so the query and its
    /// worker can be dropped independently of the resolver.
    query: Option<Arc<dyn ContactQuery>>,
    resolved: Option<String>,
}

/// Resolves a single address to a display name through one external
/// [`ContactQuery`], keeping the first non-empty name that streams in and
/// cancelling the query as soon as it has one.
///
/// A resolver is single-shot: once stopped it cannot be reattached. Issue a
/// new resolver to retry.
///
/// `stop` may race between a query callback and an outside caller (timeout,
/// teardown); whichever wins performs the detach/cancel exactly once and the
/// loser is a no-op.
pub struct AddressResolver {
    address: String,
    inner: Mutex<Inner>,
    done: Notify,
}

impl AddressResolver {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            inner: Mutex::new(Inner { state: State::Idle, query: None, resolved: None }),
            done: Notify::new(),
        }
    }

    /// The address being resolved.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Attach this resolver to a query and begin listening for results.
    ///
    /// Returns an error if the resolver was already started or stopped.
    /// Does not start the query; the caller owns that ordering.
    pub fn start(self: &Arc<Self>, query: Arc<dyn ContactQuery>) -> Result<()> {
        {
            let mut inner = self.inner.lock().unwrap();
            match inner.state {
                State::Idle => {
                    inner.state = State::Running;
                    inner.query = Some(query.clone());
                }
                State::Running => bail!("resolver for '{}' is already running", self.address),
                State::Stopped => {
                    bail!("resolver for '{}' was stopped and cannot be reused", self.address)
                }
            }
        }
        query.add_listener(self.clone());
        // A stop racing into the gap above had nothing to detach yet;
        // undo the attach ourselves so a stopped resolver never stays
        // registered on the query.
        if self.inner.lock().unwrap().state == State::Stopped {
            query.remove_listener(self.as_ref());
        }
        debug!("Resolving display name for '{}'", self.address);
        Ok(())
    }

    /// Detach from the query, request its cancellation, and release it.
    ///
    /// Idempotent and safe to call concurrently with query callbacks: only
    /// the call that observes `Running` performs the detach and cancel. Does
    /// not wait for the query to honor cancellation.
    pub fn stop(&self) {
        let query = {
            let mut inner = self.inner.lock().unwrap();
            if inner.state != State::Running {
                return;
            }
            inner.state = State::Stopped;
            inner.query.take()
        };
        // Lock released: detaching re-enters the query's listener list.
        if let Some(query) = query {
            query.remove_listener(self);
            query.cancel();
        }
        debug!("Stopped resolving '{}'", self.address);
        self.done.notify_waiters();
    }

    /// True while attached to a query that has not been stopped.
    pub fn is_running(&self) -> bool {
        self.inner.lock().unwrap().state == State::Running
    }

    /// True once a non-empty display name has been captured. Remains true
    /// for the rest of the resolver's lifetime.
    pub fn is_resolved(&self) -> bool {
        self.inner.lock().unwrap().resolved.is_some()
    }

    /// The captured display name, if any.
    pub fn display_name(&self) -> Option<String> {
        self.inner.lock().unwrap().resolved.clone()
    }

    /// Wait until the resolver reaches its terminal state, returning the
    /// captured name. Intended for callers that started the resolver; a
    /// never-started resolver never completes.
    pub async fn wait(&self) -> Option<String> {
        loop {
            // Register before checking state so a stop between the check
            // and the await is not missed.
            let notified = self.done.notified();
            {
                let inner = self.inner.lock().unwrap();
                if inner.state == State::Stopped {
                    return inner.resolved.clone();
                }
            }
            notified.await;
        }
    }
}

impl QueryListener for AddressResolver {
    fn on_result(&self, candidate: &Candidate) {
        let Some(name) = candidate.non_empty_name() else {
            trace!("Ignoring unnamed candidate for '{}'", self.address);
            return;
        };
        {
            let mut inner = self.inner.lock().unwrap();
            // Late delivery after stop, or a second match racing the first.
            if inner.state != State::Running || inner.resolved.is_some() {
                return;
            }
            inner.resolved = Some(name.to_string());
        }
        debug!("Resolved '{}' to '{}'", self.address, name);
        self.stop();
    }

    fn on_query_finished(&self) {
        trace!("Query finished for '{}'", self.address);
        self.stop();
    }
}
