//! In-memory lookup backend shared by the unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;

use crate::client::{LookupKind, PostcodeLookup};
use crate::types::PostalRecord;

/// Canned answers per lookup kind. A kind mapped to `None` fails.
#[derive(Default)]
pub struct StaticLookup {
    answers: HashMap<LookupKind, Option<Vec<PostalRecord>>>,
    calls: AtomicUsize,
    seen: Mutex<Vec<LookupKind>>,
}

impl StaticLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, kind: LookupKind, records: Vec<PostalRecord>) -> Self {
        self.answers.insert(kind, Some(records));
        self
    }

    pub fn fail(mut self, kind: LookupKind) -> Self {
        self.answers.insert(kind, None);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<LookupKind> {
        self.seen.lock().unwrap().clone()
    }
}

impl PostcodeLookup for StaticLookup {
    async fn lookup(
        &self,
        kind: LookupKind,
        _query: &str,
        _username: &str,
        _country: &str,
    ) -> Result<Vec<PostalRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(kind);
        match self.answers.get(&kind) {
            Some(Some(records)) => Ok(records.clone()),
            Some(None) => anyhow::bail!("{} unavailable", kind),
            None => Ok(Vec::new()),
        }
    }
}

pub fn record(postcode: &str, city: &str) -> PostalRecord {
    PostalRecord::new(postcode, city)
}
