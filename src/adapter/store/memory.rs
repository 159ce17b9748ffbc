//! In-memory store.
//!
//! Documents are kept in their serialized JSON form so that loads hand out
//! independent copies, exactly like a file-backed store would.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde_json::Value;

use crate::error::{Result, StoreError};
use crate::port::{Document, Domain, Store};

#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Mutex<HashMap<Domain, Value>>,
    saves: Mutex<HashMap<Domain, usize>>,
    failing: AtomicBool,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The persisted JSON of a domain, if it was ever saved.
    #[must_use]
    pub fn raw(&self, domain: Domain) -> Option<Value> {
        self.documents.lock().get(&domain).cloned()
    }

    /// Make every following save fail until switched back off.
    pub fn fail_saves(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// How many times a domain has been saved.
    #[must_use]
    pub fn save_count(&self, domain: Domain) -> usize {
        self.saves.lock().get(&domain).copied().unwrap_or(0)
    }
}

impl Store for MemoryStore {
    async fn load<D: Document>(&self) -> Result<D> {
        let value = self.documents.lock().get(&D::DOMAIN).cloned();
        match value {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(D::default()),
        }
    }

    async fn save<D: Document>(&self, document: &D) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Write {
                path: PathBuf::from(D::DOMAIN.file_name()),
                source: io::Error::other("saves are switched off"),
            }
            .into());
        }
        let value = serde_json::to_value(document).map_err(|source| StoreError::Encode {
            domain: D::DOMAIN.key(),
            source,
        })?;
        self.documents.lock().insert(D::DOMAIN, value);
        *self.saves.lock().entry(D::DOMAIN).or_insert(0) += 1;
        Ok(())
    }
}
