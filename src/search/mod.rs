use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::remote::{ApiError, Note, NotesApi};

mod debounce;

pub use debounce::SearchDebouncer;

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct SearchTicket {
    pub seq: u64,
    pub query: String,
    pub token: CancelToken,
}

#[derive(Debug)]
pub struct SearchReply {
    pub seq: u64,
    pub query: String,
    pub token: CancelToken,
    pub result: Result<Vec<Note>, ApiError>,
}

impl SearchTicket {
    /// Runs the search unless the ticket was superseded before it was sent.
    pub fn execute(self, api: &dyn NotesApi) -> Option<SearchReply> {
        if self.token.is_cancelled() {
            tracing::debug!(seq = self.seq, "skipping superseded search");
            return None;
        }
        let result = api.search_notes(&self.query);
        Some(SearchReply {
            seq: self.seq,
            query: self.query,
            token: self.token,
            result,
        })
    }
}

#[derive(Debug, Default)]
pub struct SearchSequencer {
    issued: u64,
    latest: Option<CancelToken>,
}

impl SearchSequencer {
    pub fn issue(&mut self, query: &str) -> SearchTicket {
        self.cancel_pending();
        self.issued += 1;
        let token = CancelToken::new();
        self.latest = Some(token.clone());
        SearchTicket {
            seq: self.issued,
            query: query.to_string(),
            token,
        }
    }

    pub fn cancel_pending(&mut self) {
        if let Some(token) = self.latest.take() {
            token.cancel();
        }
    }

    /// True while the latest issued ticket is neither answered nor cancelled.
    pub fn is_outstanding(&self) -> bool {
        self.latest
            .as_ref()
            .is_some_and(|token| !token.is_cancelled())
    }

    pub fn latest_seq(&self) -> u64 {
        self.issued
    }

    pub fn accepts(&self, reply: &SearchReply) -> bool {
        !reply.token.is_cancelled() && reply.seq == self.issued && self.latest.is_some()
    }
}
