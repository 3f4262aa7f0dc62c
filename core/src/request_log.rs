use std::collections::VecDeque;

use crate::document::{Document, DocumentId, DocumentStatus};
use crate::engine::SearchEngine;
use crate::error::Result;

/// Requests kept by default: one per minute for a day.
pub const DEFAULT_WINDOW: usize = 1440;

#[derive(Debug, Clone, Copy)]
struct RequestRecord {
    result_count: usize,
    timestamp: u64,
}

/// Counts requests that found nothing among the most recent `window`
/// requests. Each request advances a logical clock by one tick.
#[derive(Debug, Clone)]
pub struct RequestLog {
    window: usize,
    requests: VecDeque<RequestRecord>,
    timestamp: u64,
    no_result_count: usize,
}

impl Default for RequestLog {
    fn default() -> Self {
        Self::with_window(DEFAULT_WINDOW)
    }
}

impl RequestLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A zero window is treated as one.
    pub fn with_window(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            requests: VecDeque::with_capacity(window),
            timestamp: 0,
            no_result_count: 0,
        }
    }

    pub fn add_find_request(&mut self, engine: &SearchEngine, raw_query: &str) -> Result<Vec<Document>> {
        let documents = engine.find_top_documents(raw_query)?;
        self.record(documents.len());
        Ok(documents)
    }

    pub fn add_find_request_with_status(
        &mut self,
        engine: &SearchEngine,
        raw_query: &str,
        status: DocumentStatus,
    ) -> Result<Vec<Document>> {
        let documents = engine.find_top_documents_with_status(raw_query, status)?;
        self.record(documents.len());
        Ok(documents)
    }

    pub fn add_find_request_by<P>(
        &mut self,
        engine: &SearchEngine,
        raw_query: &str,
        predicate: P,
    ) -> Result<Vec<Document>>
    where
        P: Fn(DocumentId, DocumentStatus, i32) -> bool + Sync,
    {
        let documents = engine.find_top_documents_by(raw_query, predicate)?;
        self.record(documents.len());
        Ok(documents)
    }

    /// Record one finished request. Failed requests are never recorded.
    pub fn record(&mut self, result_count: usize) {
        self.timestamp += 1;
        while self.requests.len() >= self.window {
            if let Some(old) = self.requests.pop_front() {
                if old.result_count == 0 {
                    self.no_result_count -= 1;
                }
            }
        }
        self.requests.push_back(RequestRecord {
            result_count,
            timestamp: self.timestamp,
        });
        if result_count == 0 {
            self.no_result_count += 1;
        }
    }

    pub fn no_result_requests(&self) -> usize {
        self.no_result_count
    }

    /// Requests currently inside the window.
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Logical time of the latest request.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Logical time of the oldest request still inside the window.
    pub fn oldest_timestamp(&self) -> Option<u64> {
        self.requests.front().map(|r| r.timestamp)
    }
}
