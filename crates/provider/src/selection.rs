use std::sync::Arc;

use crate::error::ProviderError;

/// Sort a fallback chain ascending by priority so consumers can walk it
/// front to back.
pub fn sort_by_priority<T: ?Sized>(adapters: &mut [Arc<T>], priority: impl Fn(&T) -> u16) {
    adapters.sort_by_key(|a| priority(a.as_ref()));
}

/// Accumulates failed attempts while walking a fallback chain, so the
/// final error names every adapter that was tried.
#[derive(Debug, Default)]
pub struct AttemptLog {
    attempts: Vec<(String, String)>,
}

impl AttemptLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failed attempt.
    pub fn record(&mut self, provider: &str, error: &ProviderError) {
        self.attempts.push((provider.to_owned(), error.to_string()));
    }

    /// Whether any attempt was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    /// Number of recorded attempts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    /// Collapse the log into an [`ProviderError::Exhausted`] describing the
    /// operation and each attempt. An empty log means no adapter was
    /// available at all.
    #[must_use]
    pub fn into_error(self, operation: &str) -> ProviderError {
        if self.attempts.is_empty() {
            return ProviderError::Exhausted(format!("{operation}: no adapter available"));
        }
        let attempts = self
            .attempts
            .iter()
            .map(|(provider, error)| format!("{provider}: {error}"))
            .collect::<Vec<_>>()
            .join("; ");
        ProviderError::Exhausted(format!("{operation}: {attempts}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str, u16);

    #[test]
    fn sort_orders_ascending_by_priority() {
        let mut adapters: Vec<Arc<Named>> = vec![
            Arc::new(Named("mock", 999)),
            Arc::new(Named("primary", 10)),
            Arc::new(Named("secondary", 50)),
        ];
        sort_by_priority(&mut adapters, |a| a.1);
        let names: Vec<&str> = adapters.iter().map(|a| a.0).collect();
        assert_eq!(names, ["primary", "secondary", "mock"]);
    }

    #[test]
    fn attempt_log_aggregates_each_attempt() {
        let mut log = AttemptLog::new();
        log.record("sendgrid", &ProviderError::RateLimited);
        log.record(
            "smtp",
            &ProviderError::Connection("connection refused".into()),
        );
        let err = log.into_error("send email");
        let text = err.to_string();
        assert!(text.contains("sendgrid: rate limited"));
        assert!(text.contains("smtp: connection error"));
    }

    #[test]
    fn empty_log_reports_no_adapter() {
        let err = AttemptLog::new().into_error("traffic lookup");
        assert!(err.to_string().contains("no adapter available"));
    }
}
