use std::collections::VecDeque;

pub const FETCH_FAILED: &str = "An error occurred while fetching notes.";
pub const ACTION_FAILED: &str = "An error occurred. Please try again.";
pub const TAG_FAILED: &str = "An error occurred while adding the tag. Please try again.";
pub const LOGIN_FAILED: &str = "Login failed. Please check your credentials.";

/// User-facing notifications queued by controllers after a failed remote call.
///
/// Front ends drain the queue and present each entry as a blocking notice.
#[derive(Debug, Clone, Default)]
pub struct AlertQueue {
    pending: VecDeque<String>,
}

impl AlertQueue {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.pending.push_back(message.into());
    }

    pub fn pop(&mut self) -> Option<String> {
        self.pending.pop_front()
    }

    pub fn drain(&mut self) -> Vec<String> {
        self.pending.drain(..).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.pending.iter().map(String::as_str)
    }
}
