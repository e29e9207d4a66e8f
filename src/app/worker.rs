use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};

use crate::remote::NotesApi;
use crate::search::{SearchReply, SearchTicket};

enum WorkerRequest {
    Search(SearchTicket),
    Shutdown,
}

pub struct RemoteWorker {
    requests: Sender<WorkerRequest>,
    replies: Receiver<SearchReply>,
    handle: Option<JoinHandle<()>>,
}

impl RemoteWorker {
    pub fn spawn(api: Arc<dyn NotesApi>) -> Result<Self> {
        let (request_tx, request_rx) = unbounded();
        let (reply_tx, reply_rx) = unbounded();
        let handle = thread::Builder::new()
            .name("notedash-remote".into())
            .spawn(move || worker_loop(api.as_ref(), request_rx, reply_tx))
            .context("failed to start remote worker thread")?;
        tracing::debug!("remote worker started");
        Ok(Self {
            requests: request_tx,
            replies: reply_rx,
            handle: Some(handle),
        })
    }

    pub fn submit(&self, ticket: SearchTicket) -> bool {
        let seq = ticket.seq;
        if self.requests.send(WorkerRequest::Search(ticket)).is_err() {
            tracing::error!(seq, "remote worker is gone, search dropped");
            return false;
        }
        true
    }

    pub fn try_recv(&self) -> Option<SearchReply> {
        match self.replies.try_recv() {
            Ok(reply) => Some(reply),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    #[cfg(test)]
    fn recv_timeout(&self, timeout: std::time::Duration) -> Option<SearchReply> {
        self.replies.recv_timeout(timeout).ok()
    }

    /// Drops every reply that has arrived but not been applied.
    pub fn discard_replies(&self) -> usize {
        self.replies.try_iter().count()
    }
}

// Requests carry no timeout, so a search may still be on the wire here.
// An unfinished thread is detached; it exits once its reply send fails or it
// reads the shutdown request.
impl Drop for RemoteWorker {
    fn drop(&mut self) {
        let _ = self.requests.send(WorkerRequest::Shutdown);
        let Some(handle) = self.handle.take() else {
            return;
        };
        if !handle.is_finished() {
            tracing::debug!("remote worker busy, detaching");
            return;
        }
        if handle.join().is_err() {
            tracing::error!("remote worker panicked");
        }
    }
}

fn worker_loop(api: &dyn NotesApi, requests: Receiver<WorkerRequest>, replies: Sender<SearchReply>) {
    for request in requests {
        match request {
            WorkerRequest::Search(ticket) => {
                let Some(reply) = ticket.execute(api) else {
                    continue;
                };
                if replies.send(reply).is_err() {
                    break;
                }
            }
            WorkerRequest::Shutdown => break,
        }
    }
    tracing::debug!("remote worker stopped");
}
