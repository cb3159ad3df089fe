//! Caller-side orchestration of a single resolution attempt.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use log::debug;

use crate::query::ContactSource;
use crate::resolver::AddressResolver;

/// Resolve `address` to a display name, waiting until the source's query
/// completes or a match is found. Returns `None` when no contact carries a
/// non-empty name for the address.
pub async fn resolve_display_name(
    source: &dyn ContactSource,
    address: &str,
) -> Result<Option<String>> {
    let resolver = Arc::new(AddressResolver::new(address));
    let query = source.search(address).await?;
    // Attach before starting so no candidate can slip past the listener.
    resolver.start(query.clone())?;
    query.start();
    Ok(resolver.wait().await)
}

/// Like [`resolve_display_name`], but give up after `timeout`. The deadline
/// belongs to the caller, not the resolver: on expiry the resolver is
/// stopped, which cancels the underlying query.
pub async fn resolve_with_timeout(
    source: &dyn ContactSource,
    address: &str,
    timeout: Duration,
) -> Result<Option<String>> {
    let resolver = Arc::new(AddressResolver::new(address));
    let query = source.search(address).await?;
    resolver.start(query.clone())?;
    query.start();

    match tokio::time::timeout(timeout, resolver.wait()).await {
        Ok(name) => Ok(name),
        Err(_) => {
            debug!("Lookup for '{}' timed out after {:?}", address, timeout);
            resolver.stop();
            Ok(resolver.display_name())
        }
    }
}
