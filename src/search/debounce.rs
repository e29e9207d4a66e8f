use std::time::{Duration, Instant};

/// Holds the latest search input and releases it once typing has paused.
#[derive(Debug, Clone)]
pub struct SearchDebouncer {
    delay: Duration,
    query: String,
    pending_since: Option<Instant>,
}

impl SearchDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            query: String::new(),
            pending_since: None,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_pending(&self) -> bool {
        self.pending_since.is_some()
    }

    /// Records new input. Blank input clears any pending release.
    pub fn update(&mut self, query: &str, now: Instant) {
        self.query.clear();
        self.query.push_str(query);
        self.pending_since = if query.trim().is_empty() {
            None
        } else {
            Some(now)
        };
    }

    /// Returns the query once the input has been idle for the full delay.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        let since = self.pending_since?;
        if now.saturating_duration_since(since) < self.delay {
            return None;
        }
        self.pending_since = None;
        Some(self.query.clone())
    }

    pub fn clear(&mut self) {
        self.query.clear();
        self.pending_since = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn releases_only_after_idle_interval() {
        let start = Instant::now();
        let mut debouncer = SearchDebouncer::new(Duration::from_millis(500));
        debouncer.update("t", start);
        debouncer.update("to", start + Duration::from_millis(100));
        debouncer.update("todo", start + Duration::from_millis(200));
        assert_eq!(debouncer.poll(start + Duration::from_millis(600)), None);
        assert_eq!(
            debouncer.poll(start + Duration::from_millis(700)),
            Some("todo".to_string())
        );
        assert_eq!(debouncer.poll(start + Duration::from_millis(1_500)), None);
    }

    #[test]
    fn blank_input_is_never_released() {
        let start = Instant::now();
        let mut debouncer = SearchDebouncer::new(Duration::from_millis(500));
        debouncer.update("todo", start);
        debouncer.update("   ", start + Duration::from_millis(10));
        assert!(!debouncer.is_pending());
        assert_eq!(debouncer.poll(start + Duration::from_secs(5)), None);
        assert_eq!(debouncer.query(), "   ");
    }
}
