//! Authentication handshake state machine
//!
//! The handshake is a control-plane exchange: the client sends a
//! `quoine:auth_request` over the raw-message channel and the exchange
//! replies with `quoine:auth_success` or `quoine:auth_failure` as global
//! events. State lives behind a single mutex; a generation counter makes
//! stale timers and late replies harmless.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;

/// Event tag of the outbound auth request
pub const AUTH_REQUEST_EVENT: &str = "quoine:auth_request";
/// Global event signalling a successful handshake
pub const AUTH_SUCCESS_EVENT: &str = "quoine:auth_success";
/// Global event signalling a rejected handshake
pub const AUTH_FAILURE_EVENT: &str = "quoine:auth_failure";
/// Path signed for the realtime handshake
pub const REALTIME_PATH: &str = "/realtime";

/// Authentication state of the current connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// No handshake attempted on this connection
    Unauthenticated,
    /// Request sent, waiting for the success/failure event
    Pending,
    /// Handshake confirmed; private channels usable
    Authenticated,
    /// Handshake rejected or timed out; private channels blocked until
    /// the next reconnect cycle
    Failed,
}

/// Outcome of feeding a success/failure event into the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    /// The state transitioned
    Transitioned,
    /// The event did not apply to the current state (late or duplicate)
    Ignored,
    /// The pending handshake had already exceeded its deadline; the event
    /// was discarded and the state moved to Failed
    TimedOut,
}

#[derive(Debug)]
struct AuthSlot {
    state: AuthState,
    generation: u64,
    deadline: Option<Instant>,
}

/// Owns the authentication state for a client
///
/// Cheap to clone; clones share the same state.
#[derive(Debug, Clone)]
pub struct AuthManager {
    inner: Arc<Mutex<AuthSlot>>,
    timeout: Duration,
}

impl AuthManager {
    /// Create a manager with the configured response timeout
    pub fn new(timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(AuthSlot {
                state: AuthState::Unauthenticated,
                generation: 0,
                deadline: None,
            })),
            timeout,
        }
    }

    /// The configured response timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Current state
    pub fn state(&self) -> AuthState {
        self.inner.lock().state
    }

    /// Whether private channels may dispatch
    pub fn is_authenticated(&self) -> bool {
        self.state() == AuthState::Authenticated
    }

    /// Whether a handshake is in flight
    pub fn is_pending(&self) -> bool {
        self.state() == AuthState::Pending
    }

    /// Start a handshake
    ///
    /// Returns the generation of the new attempt, or `None` when a
    /// handshake is already pending (idempotent, no double-send).
    pub fn begin(&self) -> Option<u64> {
        let mut slot = self.inner.lock();
        if slot.state == AuthState::Pending {
            return None;
        }
        slot.generation += 1;
        slot.state = AuthState::Pending;
        slot.deadline = Some(Instant::now() + self.timeout);
        Some(slot.generation)
    }

    /// Apply a `quoine:auth_success` event
    pub fn succeed(&self) -> AuthOutcome {
        self.complete(AuthState::Authenticated)
    }

    /// Apply a `quoine:auth_failure` event
    pub fn fail(&self) -> AuthOutcome {
        self.complete(AuthState::Failed)
    }

    fn complete(&self, next: AuthState) -> AuthOutcome {
        let mut slot = self.inner.lock();
        if slot.state != AuthState::Pending {
            return AuthOutcome::Ignored;
        }
        if slot.deadline.is_some_and(|d| Instant::now() > d) {
            slot.state = AuthState::Failed;
            slot.deadline = None;
            return AuthOutcome::TimedOut;
        }
        slot.state = next;
        slot.deadline = None;
        AuthOutcome::Transitioned
    }

    /// Expire the attempt with the given generation
    ///
    /// Used by the timeout timer. Returns true if the state moved
    /// `Pending -> Failed`; a stale generation is a no-op.
    pub fn expire(&self, generation: u64) -> bool {
        let mut slot = self.inner.lock();
        if slot.state == AuthState::Pending && slot.generation == generation {
            slot.state = AuthState::Failed;
            slot.deadline = None;
            true
        } else {
            false
        }
    }

    /// Roll back the attempt with the given generation
    ///
    /// Used when the request never reached the wire. The state returns to
    /// `Unauthenticated` so a later call can start a fresh handshake;
    /// a stale generation is a no-op.
    pub fn abort(&self, generation: u64) -> bool {
        let mut slot = self.inner.lock();
        if slot.state == AuthState::Pending && slot.generation == generation {
            slot.state = AuthState::Unauthenticated;
            slot.deadline = None;
            true
        } else {
            false
        }
    }

    /// Transition `Pending -> Failed` if the deadline has passed
    ///
    /// Deadline enforcement on the event path; keeps the timeout honest
    /// even without a running timer.
    pub fn poll_timeout(&self) -> bool {
        let mut slot = self.inner.lock();
        if slot.state == AuthState::Pending && slot.deadline.is_some_and(|d| Instant::now() > d) {
            slot.state = AuthState::Failed;
            slot.deadline = None;
            true
        } else {
            false
        }
    }

    /// Reset to `Unauthenticated` (connect/disconnect transitions)
    pub fn reset(&self) {
        let mut slot = self.inner.lock();
        slot.state = AuthState::Unauthenticated;
        slot.deadline = None;
    }
}

/// Outbound handshake payload
///
/// Serializes to
/// `{"event":"quoine:auth_request","data":{"path":"/realtime","headers":{"X-Quoine-Auth":"..."}}}`.
#[derive(Debug, Serialize)]
pub struct AuthRequest {
    event: &'static str,
    data: AuthRequestData,
}

#[derive(Debug, Serialize)]
struct AuthRequestData {
    path: &'static str,
    headers: HashMap<String, String>,
}

impl AuthRequest {
    /// Wrap signature headers into the handshake payload
    pub fn new(headers: HashMap<String, String>) -> Self {
        Self {
            event: AUTH_REQUEST_EVENT,
            data: AuthRequestData {
                path: REALTIME_PATH,
                headers,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> AuthManager {
        AuthManager::new(Duration::from_secs(5))
    }

    #[test]
    fn test_handshake_success_path() {
        let auth = manager();
        assert_eq!(auth.state(), AuthState::Unauthenticated);

        assert!(auth.begin().is_some());
        assert_eq!(auth.state(), AuthState::Pending);

        assert_eq!(auth.succeed(), AuthOutcome::Transitioned);
        assert!(auth.is_authenticated());
    }

    #[test]
    fn test_handshake_failure_path() {
        let auth = manager();
        auth.begin().unwrap();
        assert_eq!(auth.fail(), AuthOutcome::Transitioned);
        assert_eq!(auth.state(), AuthState::Failed);
    }

    #[test]
    fn test_begin_is_idempotent_while_pending() {
        let auth = manager();
        assert!(auth.begin().is_some());
        assert!(auth.begin().is_none());
    }

    #[test]
    fn test_events_outside_pending_are_ignored() {
        let auth = manager();
        assert_eq!(auth.succeed(), AuthOutcome::Ignored);
        assert_eq!(auth.fail(), AuthOutcome::Ignored);

        auth.begin().unwrap();
        auth.succeed();
        // Duplicate success after completion
        assert_eq!(auth.succeed(), AuthOutcome::Ignored);
    }

    #[test]
    fn test_late_event_after_deadline_times_out() {
        let auth = AuthManager::new(Duration::ZERO);
        auth.begin().unwrap();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(auth.succeed(), AuthOutcome::TimedOut);
        assert_eq!(auth.state(), AuthState::Failed);
    }

    #[test]
    fn test_expire_only_applies_to_matching_generation() {
        let auth = manager();
        let first = auth.begin().unwrap();
        auth.succeed();
        auth.reset();

        let second = auth.begin().unwrap();
        assert_ne!(first, second);

        // Stale timer from the first attempt must not clobber the second
        assert!(!auth.expire(first));
        assert_eq!(auth.state(), AuthState::Pending);

        assert!(auth.expire(second));
        assert_eq!(auth.state(), AuthState::Failed);
    }

    #[test]
    fn test_abort_rolls_back_to_unauthenticated() {
        let auth = manager();
        let generation = auth.begin().unwrap();
        assert!(auth.abort(generation));
        assert_eq!(auth.state(), AuthState::Unauthenticated);

        // A fresh attempt can start immediately
        assert!(auth.begin().is_some());
    }

    #[test]
    fn test_abort_ignores_stale_generation() {
        let auth = manager();
        let first = auth.begin().unwrap();
        auth.abort(first);

        let second = auth.begin().unwrap();
        assert!(!auth.abort(first));
        assert_eq!(auth.state(), AuthState::Pending);
        assert!(auth.abort(second));
    }

    #[test]
    fn test_poll_timeout() {
        let auth = AuthManager::new(Duration::ZERO);
        auth.begin().unwrap();
        std::thread::sleep(Duration::from_millis(5));
        assert!(auth.poll_timeout());
        assert_eq!(auth.state(), AuthState::Failed);
        // Second poll is a no-op
        assert!(!auth.poll_timeout());
    }

    #[test]
    fn test_reset_clears_state() {
        let auth = manager();
        auth.begin().unwrap();
        auth.succeed();
        auth.reset();
        assert_eq!(auth.state(), AuthState::Unauthenticated);
    }

    #[test]
    fn test_auth_request_wire_shape() {
        let mut headers = HashMap::new();
        headers.insert("X-Quoine-Auth".to_string(), "sig".to_string());
        let json = serde_json::to_string(&AuthRequest::new(headers)).unwrap();
        assert_eq!(
            json,
            r#"{"event":"quoine:auth_request","data":{"path":"/realtime","headers":{"X-Quoine-Auth":"sig"}}}"#
        );
    }
}
