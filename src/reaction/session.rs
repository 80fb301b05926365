//! Attempts recorded during one session and the aggregate derived from them.

use std::time::Duration;

use uuid::Uuid;

/// One valid, recorded stimulus/response measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    /// Delay that was drawn before the stimulus appeared.
    pub scheduled_delay: Duration,
    /// Time between stimulus presentation and the response, in milliseconds.
    pub latency_ms: u32,
}

/// Ordered sequence of attempts owned by one machine instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: Uuid,
    target: usize,
    attempts: Vec<Attempt>,
}

impl Session {
    /// Start an empty session expecting `target` attempts (at least one).
    pub fn new(target: usize) -> Self {
        let target = target.max(1);
        Self {
            id: Uuid::new_v4(),
            target,
            attempts: Vec::with_capacity(target),
        }
    }

    /// Identifier assigned when the first trial started.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Recorded latencies in milliseconds.
    pub fn latencies(&self) -> Vec<u32> {
        self.attempts.iter().map(|a| a.latency_ms).collect()
    }

    /// Append an attempt. Attempts beyond the target are ignored.
    pub fn record(&mut self, attempt: Attempt) {
        if !self.is_complete() {
            self.attempts.push(attempt);
        }
    }

    /// True once `target` attempts have been recorded.
    pub fn is_complete(&self) -> bool {
        self.attempts.len() >= self.target
    }

    /// Mean latency once the session is complete.
    pub fn average_ms(&self) -> Option<u32> {
        if self.is_complete() {
            average_ms(&self.latencies())
        } else {
            None
        }
    }

    /// Snapshot handed to the result submitter.
    pub fn completed(&self, test_type: &str) -> Option<CompletedSession> {
        let average_ms = self.average_ms()?;
        Some(CompletedSession {
            session_id: self.id,
            test_type: test_type.to_string(),
            attempts: self.latencies(),
            average_ms,
        })
    }
}

/// A finished session ready to be submitted to the result service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedSession {
    /// Session identifier.
    pub session_id: Uuid,
    /// Leaderboard the session belongs to.
    pub test_type: String,
    /// Every measured latency, in order.
    pub attempts: Vec<u32>,
    /// Mean of `attempts`, rounded half-up.
    pub average_ms: u32,
}

/// Arithmetic mean rounded half-up to the nearest millisecond.
pub fn average_ms(values: &[u32]) -> Option<u32> {
    if values.is_empty() {
        return None;
    }
    let count = values.len() as u64;
    let sum: u64 = values.iter().map(|&v| u64::from(v)).sum();
    let rounded = (2 * sum + count) / (2 * count);
    Some(u32::try_from(rounded).unwrap_or(u32::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(latency_ms: u32) -> Attempt {
        Attempt {
            scheduled_delay: Duration::from_millis(2_000),
            latency_ms,
        }
    }

    #[test]
    fn average_rounds_half_up() {
        assert_eq!(average_ms(&[200, 250, 300, 220, 280]), Some(250));
        assert_eq!(average_ms(&[1, 2]), Some(2));
        assert_eq!(average_ms(&[1, 1, 2]), Some(1));
        assert_eq!(average_ms(&[]), None);
    }

    #[test]
    fn average_is_only_exposed_once_complete() {
        let mut session = Session::new(2);
        session.record(attempt(100));
        assert_eq!(session.average_ms(), None);
        assert!(session.completed("reaction-time").is_none());

        session.record(attempt(201));
        assert_eq!(session.average_ms(), Some(151));

        let done = session.completed("reaction-time").unwrap();
        assert_eq!(done.attempts, vec![100, 201]);
        assert_eq!(done.session_id, session.id());
    }

    #[test]
    fn extra_attempts_are_ignored() {
        let mut session = Session::new(1);
        session.record(attempt(100));
        session.record(attempt(900));
        assert_eq!(session.latencies(), vec![100]);
    }
}
