//! Interfaces between contact sources, their in-flight queries, and the
//! listeners that consume incremental results.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

/// One incremental result produced by a contact query.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// The address this candidate was matched against.
    pub address: String,
    /// Human-readable label for the contact, if the source knows one.
    /// May be `Some("")` for directory records with a blank name.
    pub display_name: Option<String>,
}

impl Candidate {
    pub fn new(address: impl Into<String>, display_name: Option<String>) -> Self {
        Self { address: address.into(), display_name }
    }

    /// The display name, if present and non-empty.
    pub fn non_empty_name(&self) -> Option<&str> {
        self.display_name.as_deref().filter(|name| !name.trim().is_empty())
    }
}

/// Callbacks delivered by a query's worker context. Implementations must not
/// block: results stream from an async task and a slow handler stalls every
/// other listener on the same query.
pub trait QueryListener: Send + Sync {
    /// A candidate match streamed in. May be called any number of times.
    fn on_result(&self, candidate: &Candidate);

    /// The query finished producing results (success or exhaustion).
    /// Fired at most once per listener.
    fn on_query_finished(&self);
}

/// An asynchronous, cancellable search operation against a contact directory.
///
/// Queries are created idle; listeners attach first, then `start` begins
/// producing results. Cancellation is cooperative; callbacks may still
/// arrive after `cancel` until the worker honors the request, so listeners
/// must tolerate late deliveries.
pub trait ContactQuery: Send + Sync {
    /// The address this query is searching for.
    fn address(&self) -> &str;

    /// Attach a listener. Attaching to an already-finished query delivers
    /// `on_query_finished` to that listener immediately.
    fn add_listener(&self, listener: Arc<dyn QueryListener>);

    /// Detach a listener by identity so it receives no further callbacks.
    /// Detaching a listener that was never attached is a no-op.
    fn remove_listener(&self, listener: &dyn QueryListener);

    /// Begin producing results. Calling more than once is a no-op.
    fn start(&self);

    /// Request termination of the search. Idempotent.
    fn cancel(&self);
}

/// A service capable of searching for contacts by address.
#[async_trait]
pub trait ContactSource: Send + Sync {
    /// Create a query for `address`. The returned query has not been
    /// started; attach listeners before calling [`ContactQuery::start`].
    async fn search(&self, address: &str) -> Result<Arc<dyn ContactQuery>>;
}

/// Compare two listeners by identity (the object they point at), ignoring
/// vtable metadata so the same object behind different trait-object fat
/// pointers still matches.
pub(crate) fn listener_eq(a: &Arc<dyn QueryListener>, b: &dyn QueryListener) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        b as *const dyn QueryListener as *const (),
    )
}
