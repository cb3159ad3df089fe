//! In-process contact directory and its query implementation.
//!
//! The directory is an immutable snapshot of contact records, loadable from
//! a JSON file. Each search spawns a worker task that streams matches to the
//! attached listeners and honors cooperative cancellation.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, trace, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::query::{listener_eq, Candidate, ContactQuery, ContactSource, QueryListener};

// Caps on contacts files to prevent loading hostile or corrupted data
const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
const MAX_CONTACTS: usize = 10_000;

// Scheme prefix and URI parameters carry no identity information
static ADDRESS_SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:sips?|tel|mailto):").unwrap());

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Contacts file not found: {0}")]
    NotFound(PathBuf),
    #[error("Contacts file exceeds the {MAX_FILE_SIZE} byte limit")]
    FileTooLarge,
    #[error("Too many contacts (maximum {MAX_CONTACTS})")]
    TooManyContacts,
    #[error("Failed to parse contacts file: {0}")]
    Parse(String),
    #[error("I/O error reading contacts: {0}")]
    Io(#[from] std::io::Error),
}

/// One directory record. Aliases let a contact be found under secondary
/// addresses (an old SIP URI, a desk extension).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryContact {
    pub address: String,
    pub display_name: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl DirectoryContact {
    fn matches(&self, target: &str) -> bool {
        normalize_address(&self.address) == target
            || self.aliases.iter().any(|alias| normalize_address(alias) == target)
    }
}

/// Strip the URI scheme and parameters and fold case, so
/// `SIP:Alice@Example.COM;transport=tcp` and `alice@example.com` compare
/// equal.
pub fn normalize_address(address: &str) -> String {
    let stripped = ADDRESS_SCHEME.replace(address.trim(), "");
    let stripped = match stripped.split_once(';') {
        Some((head, _params)) => head,
        None => stripped.as_ref(),
    };
    stripped.to_lowercase()
}

/// An immutable, searchable snapshot of contact records.
pub struct DirectorySource {
    contacts: Arc<Vec<DirectoryContact>>,
}

impl DirectorySource {
    pub fn new(contacts: Vec<DirectoryContact>) -> Self {
        Self { contacts: Arc::new(contacts) }
    }

    /// Load contacts from a JSON file, enforcing size and count limits.
    pub fn from_file(path: &Path) -> Result<Self, DirectoryError> {
        if !path.exists() {
            return Err(DirectoryError::NotFound(path.to_path_buf()));
        }
        let metadata = std::fs::metadata(path)?;
        if metadata.len() > MAX_FILE_SIZE {
            return Err(DirectoryError::FileTooLarge);
        }

        let reader = BufReader::new(File::open(path)?);
        let contacts: Vec<DirectoryContact> = serde_json::from_reader(reader)
            .map_err(|e| DirectoryError::Parse(e.to_string()))?;
        if contacts.len() > MAX_CONTACTS {
            return Err(DirectoryError::TooManyContacts);
        }

        debug!("Loaded {} contacts from {}", contacts.len(), path.display());
        Ok(Self::new(contacts))
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    pub fn contacts(&self) -> &[DirectoryContact] {
        &self.contacts
    }
}

#[async_trait]
impl ContactSource for DirectorySource {
    async fn search(&self, address: &str) -> Result<Arc<dyn ContactQuery>> {
        let query: Arc<dyn ContactQuery> = DirectoryQuery::new(address, self.contacts.clone());
        Ok(query)
    }
}

/// A single in-flight search over a directory snapshot.
pub struct DirectoryQuery {
    address: String,
    target: String,
    contacts: Arc<Vec<DirectoryContact>>,
    listeners: Mutex<Vec<Arc<dyn QueryListener>>>,
    started: AtomicBool,
    cancelled: AtomicBool,
    finished: AtomicBool,
    // Handle on ourselves so `start` can move an owner into the worker task.
    me: Weak<DirectoryQuery>,
}

impl DirectoryQuery {
    pub fn new(address: &str, contacts: Arc<Vec<DirectoryContact>>) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            address: address.to_string(),
            target: normalize_address(address),
            contacts,
            listeners: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
            finished: AtomicBool::new(false),
            me: me.clone(),
        })
    }

    /// Snapshot the listener list before invoking callbacks: a listener may
    /// detach itself from inside its own callback, which takes the same
    /// lock.
    fn snapshot(&self) -> Vec<Arc<dyn QueryListener>> {
        self.listeners.lock().unwrap().clone()
    }

    fn deliver(&self, candidate: &Candidate) {
        trace!("Delivering candidate for '{}'", self.address);
        for listener in self.snapshot() {
            listener.on_result(candidate);
        }
    }

    fn finish(&self) {
        if self.finished.swap(true, Ordering::SeqCst) {
            return;
        }
        trace!("Query for '{}' finished", self.address);
        for listener in self.snapshot() {
            listener.on_query_finished();
        }
    }

    async fn run(&self) {
        for contact in self.contacts.iter() {
            if self.cancelled.load(Ordering::SeqCst) {
                debug!("Query for '{}' cancelled", self.address);
                break;
            }
            if contact.matches(&self.target) {
                let candidate =
                    Candidate::new(self.address.clone(), contact.display_name.clone());
                self.deliver(&candidate);
            }
            // Yield between records so cancellation can land mid-scan.
            tokio::task::yield_now().await;
        }
        self.finish();
    }
}

impl ContactQuery for DirectoryQuery {
    fn address(&self) -> &str {
        &self.address
    }

    fn add_listener(&self, listener: Arc<dyn QueryListener>) {
        {
            // Check the flag under the listeners lock: `finish` snapshots
            // under the same lock after setting it, so a push that saw
            // `finished == false` is always part of that snapshot.
            let mut listeners = self.listeners.lock().unwrap();
            if !self.finished.load(Ordering::SeqCst) {
                listeners.push(listener);
                return;
            }
        }
        // The worker already signalled completion; a late subscriber would
        // otherwise wait forever. Invoked outside the lock, since the
        // callback may re-enter `remove_listener`.
        listener.on_query_finished();
    }

    fn remove_listener(&self, listener: &dyn QueryListener) {
        self.listeners.lock().unwrap().retain(|l| !listener_eq(l, listener));
    }

    fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        let Some(query) = self.me.upgrade() else {
            warn!("Query for '{}' dropped before start", self.address);
            return;
        };
        tokio::spawn(async move {
            query.run().await;
        });
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("sip:Alice@Example.com", "alice@example.com"; "sip scheme and case")]
    #[test_case("SIPS:bob@host;transport=tcp", "bob@host"; "sips with parameters")]
    #[test_case("tel:+15551234567", "+15551234567"; "tel scheme")]
    #[test_case("mailto:carol@example.org", "carol@example.org"; "mailto scheme")]
    #[test_case("  dave@example.com  ", "dave@example.com"; "surrounding whitespace")]
    #[test_case("plain@example.com", "plain@example.com"; "already normalized")]
    fn normalizes_addresses(input: &str, expected: &str) {
        assert_eq!(normalize_address(input), expected);
    }

    #[test]
    fn matches_aliases() {
        let contact = DirectoryContact {
            address: "alice@example.com".into(),
            display_name: Some("Alice Johnson".into()),
            aliases: vec!["sip:ajohnson@old.example.com".into()],
        };
        assert!(contact.matches(&normalize_address("SIP:alice@example.com")));
        assert!(contact.matches(&normalize_address("ajohnson@old.example.com")));
        assert!(!contact.matches(&normalize_address("bob@example.com")));
    }
}
