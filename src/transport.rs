use super::*;

/// Validated contact-form payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub email: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendFailure {
    pub reason: String,
}

impl SendFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for SendFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason)
    }
}

impl StdError for SendFailure {}

/// Delivers contact-form submissions.
///
/// `send` is called once the page clock has advanced by `latency_ms` after
/// the form was submitted.
pub trait SubmissionTransport {
    fn latency_ms(&self) -> i64;

    fn send(&mut self, submission: &Submission) -> std::result::Result<(), SendFailure>;
}

/// Accepts everything after a fixed delay and keeps what it was given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedTransport {
    latency_ms: i64,
    failure: Option<String>,
    sent: Vec<Submission>,
}

impl Default for SimulatedTransport {
    fn default() -> Self {
        Self::new(2000)
    }
}

impl SimulatedTransport {
    pub fn new(latency_ms: i64) -> Self {
        Self {
            latency_ms: latency_ms.max(0),
            failure: None,
            sent: Vec::new(),
        }
    }

    /// A transport that rejects every submission with `reason`.
    pub fn failing(latency_ms: i64, reason: &str) -> Self {
        Self {
            failure: Some(reason.to_string()),
            ..Self::new(latency_ms)
        }
    }

    pub fn sent(&self) -> &[Submission] {
        &self.sent
    }
}

impl SubmissionTransport for SimulatedTransport {
    fn latency_ms(&self) -> i64 {
        self.latency_ms
    }

    fn send(&mut self, submission: &Submission) -> std::result::Result<(), SendFailure> {
        if let Some(reason) = &self.failure {
            return Err(SendFailure::new(reason.as_str()));
        }
        self.sent.push(submission.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_transport_records_or_rejects() {
        let submission = Submission {
            email: "user@example.com".into(),
            message: "hello there, world".into(),
        };

        let mut ok = SimulatedTransport::default();
        assert_eq!(ok.latency_ms(), 2000);
        assert_eq!(ok.send(&submission), Ok(()));
        assert_eq!(ok.sent(), &[submission.clone()]);

        let mut failing = SimulatedTransport::failing(10, "offline");
        assert_eq!(failing.send(&submission), Err(SendFailure::new("offline")));
        assert!(failing.sent().is_empty());
    }
}
