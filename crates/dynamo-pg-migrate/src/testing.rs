//! In-memory fakes and record builders shared by unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::core::{Page, PageSource, SourceRecord, TargetRecord, TargetStore};
use crate::error::{MigrateError, Result};
use crate::translate::Encryptor;

/// Build a record from a JSON object literal.
pub fn record(value: Value) -> SourceRecord {
    match value {
        Value::Object(map) => SourceRecord::new(map),
        other => panic!("record fixture must be a JSON object, got {}", other),
    }
}

/// A valid async operation record.
pub fn async_op(id: &str, updated_at: i64, status: &str) -> SourceRecord {
    record(json!({
        "id": id,
        "description": "fixture operation",
        "operationType": "ES Index",
        "status": status,
        "createdAt": 1,
        "updatedAt": updated_at,
    }))
}

/// A valid provider record; `updatedAt` is omitted when `None`.
pub fn provider(id: &str, updated_at: Option<i64>) -> SourceRecord {
    let mut r = json!({
        "id": id,
        "protocol": "s3",
        "host": "bucket.example",
        "createdAt": 1,
    });
    if let Some(ts) = updated_at {
        r["updatedAt"] = json!(ts);
    }
    record(r)
}

/// Page source over fixed pages; the cursor is the next page index.
pub struct MemorySource {
    pages: Vec<Vec<SourceRecord>>,
    calls: Arc<AtomicUsize>,
    fail_at: Option<usize>,
    fail_once: bool,
    failed: AtomicBool,
}

impl MemorySource {
    pub fn new(pages: Vec<Vec<SourceRecord>>) -> Self {
        Self {
            pages,
            calls: Arc::new(AtomicUsize::new(0)),
            fail_at: None,
            fail_once: false,
            failed: AtomicBool::new(false),
        }
    }

    /// Every fetch of page `idx` fails.
    pub fn fail_at(mut self, idx: usize) -> Self {
        self.fail_at = Some(idx);
        self.fail_once = false;
        self
    }

    /// The first fetch of page `idx` fails; retries succeed.
    pub fn fail_once_at(mut self, idx: usize) -> Self {
        self.fail_at = Some(idx);
        self.fail_once = true;
        self
    }

    /// Shared counter of `fetch_page` calls.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl PageSource for MemorySource {
    type Cursor = usize;

    fn table_name(&self) -> &str {
        "MemoryTable"
    }

    async fn fetch_page(&self, cursor: Option<usize>) -> Result<Page<usize>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let idx = cursor.unwrap_or(0);

        if self.fail_at == Some(idx) && !(self.fail_once && self.failed.swap(true, Ordering::SeqCst))
        {
            return Err(MigrateError::source_fetch(
                self.table_name(),
                format!("simulated failure on page {}", idx),
            ));
        }

        let records = self.pages.get(idx).cloned().unwrap_or_default();
        let next = (idx + 1 < self.pages.len()).then_some(idx + 1);
        Ok(Page { records, next })
    }
}

/// Target store backed by a map, counting every call.
pub struct FakeStore<R> {
    rows: Mutex<HashMap<String, R>>,
    failing_gets: HashSet<String>,
    failing_upserts: HashSet<String>,
    gets: AtomicUsize,
    upserts: AtomicUsize,
}

impl<R: TargetRecord + Clone> FakeStore<R> {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
            failing_gets: HashSet::new(),
            failing_upserts: HashSet::new(),
            gets: AtomicUsize::new(0),
            upserts: AtomicUsize::new(0),
        }
    }

    /// Upserts of `id` fail with a pool error.
    pub fn failing_on(mut self, id: &str) -> Self {
        self.failing_upserts.insert(id.to_string());
        self
    }

    /// Lookups of `id` fail with a pool error.
    pub fn failing_get_on(mut self, id: &str) -> Self {
        self.failing_gets.insert(id.to_string());
        self
    }

    pub fn row(&self, id: &str) -> Option<R> {
        self.rows.lock().unwrap().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn get_calls(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn upsert_calls(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<R: TargetRecord + Clone> TargetStore<R> for FakeStore<R> {
    async fn get(&self, id: &str) -> Result<R> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.failing_gets.contains(id) {
            return Err(MigrateError::pool("connection refused", "fake get"));
        }
        self.row(id)
            .ok_or_else(|| MigrateError::not_found(R::TABLE, id))
    }

    async fn upsert(&self, record: &R) -> Result<()> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        if self.failing_upserts.contains(record.key()) {
            return Err(MigrateError::pool("connection reset", "fake upsert"));
        }
        let mut rows = self.rows.lock().unwrap();
        let fresher_stored = rows
            .get(record.key())
            .is_some_and(|stored| stored.updated_at() >= record.updated_at());
        if !fresher_stored {
            rows.insert(record.key().to_string(), record.clone());
        }
        Ok(())
    }
}

/// Deterministic stand-in for KMS: `enc(<plaintext>)`.
pub struct FakeEncryptor;

#[async_trait]
impl Encryptor for FakeEncryptor {
    async fn encrypt(&self, plaintext: &str) -> Result<String> {
        Ok(format!("enc({})", plaintext))
    }
}

/// Encryptor that always fails, as KMS does on a denied key.
pub struct FailingEncryptor;

#[async_trait]
impl Encryptor for FailingEncryptor {
    async fn encrypt(&self, _plaintext: &str) -> Result<String> {
        Err(MigrateError::Encryption("AccessDeniedException".into()))
    }
}
