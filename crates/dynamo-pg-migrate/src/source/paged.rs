//! Record-at-a-time reader over a paginated source.

use std::collections::VecDeque;

use tracing::debug;

use crate::core::{PageSource, SourceRecord};
use crate::error::Result;

/// Lazy, single-pass reader that hides page boundaries.
///
/// Holds at most one page of records. The next page is requested only once
/// the buffer is drained, and pages that come back empty but still carry a
/// cursor are followed until records appear or the scan ends. Exhaustion is
/// terminal: further calls return `None` without touching the source.
pub struct PagedReader<S: PageSource> {
    source: S,
    buffer: VecDeque<SourceRecord>,
    cursor: Option<S::Cursor>,
    started: bool,
    exhausted: bool,
    pages_fetched: usize,
}

impl<S: PageSource> PagedReader<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            buffer: VecDeque::new(),
            cursor: None,
            started: false,
            exhausted: false,
            pages_fetched: 0,
        }
    }

    /// The next record without consuming it, or `None` once the source is drained.
    pub async fn peek(&mut self) -> Result<Option<&SourceRecord>> {
        self.fill().await?;
        Ok(self.buffer.front())
    }

    /// Consume and return the record `peek` would return.
    pub async fn shift(&mut self) -> Result<Option<SourceRecord>> {
        self.fill().await?;
        Ok(self.buffer.pop_front())
    }

    pub fn table_name(&self) -> &str {
        self.source.table_name()
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    // On fetch error the cursor and buffer are left as they were, so the
    // failing page is requested again if the caller retries.
    async fn fill(&mut self) -> Result<()> {
        while self.buffer.is_empty() && !self.exhausted {
            if self.started && self.cursor.is_none() {
                self.exhausted = true;
                debug!(
                    "Source {} exhausted after {} pages",
                    self.source.table_name(),
                    self.pages_fetched
                );
                break;
            }

            let page = self.source.fetch_page(self.cursor.clone()).await?;
            self.started = true;
            self.pages_fetched += 1;
            debug!(
                table = self.source.table_name(),
                page = self.pages_fetched,
                records = page.records.len(),
                more = page.next.is_some(),
                "Fetched source page"
            );
            self.cursor = page.next;
            self.buffer.extend(page.records);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MigrateError;
    use crate::testing::{async_op, MemorySource};

    fn ids(n: std::ops::Range<usize>) -> Vec<SourceRecord> {
        n.map(|i| async_op(&format!("r{}", i), 100, "RUNNING")).collect()
    }

    async fn drain<S: PageSource>(reader: &mut PagedReader<S>) -> Vec<String> {
        let mut out = Vec::new();
        while let Some(record) = reader.shift().await.unwrap() {
            out.push(record.display_id().to_string());
        }
        out
    }

    #[tokio::test]
    async fn test_reads_across_page_boundaries_in_order() {
        let source = MemorySource::new(vec![ids(0..3), ids(3..5), ids(5..6)]);
        let mut reader = PagedReader::new(source);

        let got = drain(&mut reader).await;
        let expected: Vec<String> = (0..6).map(|i| format!("r{}", i)).collect();
        assert_eq!(got, expected);
        assert_eq!(reader.pages_fetched(), 3);
    }

    #[tokio::test]
    async fn test_peek_does_not_consume() {
        let source = MemorySource::new(vec![ids(0..2)]);
        let mut reader = PagedReader::new(source);

        assert_eq!(reader.peek().await.unwrap().unwrap().display_id(), "r0");
        assert_eq!(reader.peek().await.unwrap().unwrap().display_id(), "r0");
        assert_eq!(reader.shift().await.unwrap().unwrap().display_id(), "r0");
        assert_eq!(reader.peek().await.unwrap().unwrap().display_id(), "r1");
    }

    #[tokio::test]
    async fn test_follows_empty_pages_with_cursor() {
        let source = MemorySource::new(vec![vec![], ids(0..1), vec![], vec![], ids(1..2)]);
        let mut reader = PagedReader::new(source);

        assert_eq!(drain(&mut reader).await, vec!["r0", "r1"]);
        assert_eq!(reader.pages_fetched(), 5);
    }

    #[tokio::test]
    async fn test_exhaustion_is_terminal() {
        let source = MemorySource::new(vec![ids(0..1)]);
        let calls = source.calls();
        let mut reader = PagedReader::new(source);

        reader.shift().await.unwrap();
        assert!(reader.peek().await.unwrap().is_none());
        assert!(reader.peek().await.unwrap().is_none());
        assert!(reader.shift().await.unwrap().is_none());
        assert!(reader.is_exhausted());
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_source() {
        let mut reader = PagedReader::new(MemorySource::new(vec![]));
        assert!(reader.peek().await.unwrap().is_none());
        assert!(reader.is_exhausted());
    }

    #[tokio::test]
    async fn test_fetch_error_preserves_position() {
        let source = MemorySource::new(vec![ids(0..2), ids(2..4)]).fail_once_at(1);
        let mut reader = PagedReader::new(source);

        assert_eq!(reader.shift().await.unwrap().unwrap().display_id(), "r0");
        assert_eq!(reader.shift().await.unwrap().unwrap().display_id(), "r1");

        let err = reader.peek().await.unwrap_err();
        assert!(matches!(err, MigrateError::SourceFetch { .. }));
        assert!(!reader.is_exhausted());

        // The failed page is requested again rather than skipped.
        assert_eq!(drain(&mut reader).await, vec!["r2", "r3"]);
    }
}
