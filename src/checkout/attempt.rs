use dashmap::DashMap;
use uuid::Uuid;

/// State of one checkout session's payment attempt. Submission to the host
/// pipeline is permitted only from `Tokenized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentAttemptState {
    Idle,
    Tokenizing,
    Tokenized,
    Submitting,
    Settled,
    Failed,
}

/// Per-session attempt states, keyed by checkout session id. Multiple
/// concurrent checkout forms or tabs each get their own entry, so one
/// session's in-flight tokenization never blocks another's.
#[derive(Debug, Default)]
pub struct AttemptStore {
    attempts: DashMap<Uuid, PaymentAttemptState>,
}

impl AttemptStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, session_id: Uuid) -> PaymentAttemptState {
        self.attempts
            .get(&session_id)
            .map(|entry| *entry.value())
            .unwrap_or(PaymentAttemptState::Idle)
    }

    /// Claim the session for tokenization. Returns false when a tokenization
    /// is already in flight, in which case the caller must treat the submit
    /// as a no-op: the pending attempt owns the session.
    pub fn try_begin_tokenizing(&self, session_id: Uuid) -> bool {
        let mut entry = self
            .attempts
            .entry(session_id)
            .or_insert(PaymentAttemptState::Idle);
        match *entry {
            PaymentAttemptState::Tokenizing => false,
            _ => {
                *entry = PaymentAttemptState::Tokenizing;
                true
            }
        }
    }

    pub fn mark_tokenized(&self, session_id: Uuid) {
        self.attempts
            .insert(session_id, PaymentAttemptState::Tokenized);
    }

    pub fn begin_submitting(&self, session_id: Uuid) {
        self.attempts
            .insert(session_id, PaymentAttemptState::Submitting);
    }

    /// Record the submission outcome.
    pub fn finish(&self, session_id: Uuid, settled: bool) {
        let next = if settled {
            PaymentAttemptState::Settled
        } else {
            PaymentAttemptState::Failed
        };
        self.attempts.insert(session_id, next);
    }

    /// Return the session to `Idle` for another attempt.
    pub fn reset(&self, session_id: Uuid) {
        self.attempts.insert(session_id, PaymentAttemptState::Idle);
    }
}
