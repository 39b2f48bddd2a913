use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use parking_lot::Mutex;

use crate::models::device::MediaKind;
use crate::models::permission::PermissionState;
use crate::traits::authorization_provider::AuthorizationProvider;

/// Receives the resolved authorization for one request.
pub type AuthorizationCallback = Box<dyn FnOnce(PermissionState) + Send + 'static>;

type PendingPrompts = Mutex<HashMap<MediaKind, Vec<AuthorizationCallback>>>;

/// Tracks and requests per-kind capture authorization.
///
/// At most one platform prompt is in flight per media kind; requests made
/// while a prompt is showing wait for that prompt's answer.
#[derive(Clone)]
pub struct PermissionGate {
    provider: Arc<dyn AuthorizationProvider>,
    pending: Arc<PendingPrompts>,
}

impl PermissionGate {
    pub fn new(provider: Arc<dyn AuthorizationProvider>) -> Self {
        Self {
            provider,
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Current authorization for `kind`. Never blocks.
    pub fn authorization_status(&self, kind: MediaKind) -> PermissionState {
        self.provider.authorization_status(kind)
    }

    /// Whether a prompt for `kind` is currently waiting on the user.
    pub fn is_prompting(&self, kind: MediaKind) -> bool {
        self.pending.lock().contains_key(&kind)
    }

    /// Request authorization, returning a ticket that resolves once.
    pub fn request_authorization(&self, kind: MediaKind) -> AuthorizationTicket {
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.request_with(
            kind,
            Box::new(move |state| {
                let _ = tx.send(state);
            }),
        );
        AuthorizationTicket { receiver: rx }
    }

    /// Request authorization and deliver the result to `callback`.
    ///
    /// Settled states are delivered immediately on the calling thread. For
    /// `Undetermined` the callback runs on the platform's callback thread
    /// once the user answers, with the status re-read from the platform.
    /// If the platform drops its callback without answering, `callback` is
    /// dropped too and never runs.
    pub fn request_with(&self, kind: MediaKind, callback: AuthorizationCallback) {
        let status = self.provider.authorization_status(kind);
        if status != PermissionState::Undetermined {
            callback(status);
            return;
        }

        {
            let mut pending = self.pending.lock();
            if let Some(waiters) = pending.get_mut(&kind) {
                log::debug!("Joining in-flight {} authorization prompt", kind);
                waiters.push(callback);
                return;
            }
            pending.insert(kind, vec![callback]);
        }

        log::info!("Requesting {} capture authorization", kind);
        let mut prompt = PromptGuard {
            kind,
            provider: Arc::downgrade(&self.provider),
            pending: Arc::downgrade(&self.pending),
            answered: false,
        };
        self.provider
            .request_access(kind, Box::new(move |granted| prompt.answer(granted)));
    }
}

/// Owned by the platform callback. Resolves waiters on answer and clears the
/// in-flight entry if the callback is dropped unanswered, so a later request
/// can prompt again.
struct PromptGuard {
    kind: MediaKind,
    provider: Weak<dyn AuthorizationProvider>,
    pending: Weak<PendingPrompts>,
    answered: bool,
}

impl PromptGuard {
    fn answer(&mut self, granted: bool) {
        self.answered = true;
        let Some(pending) = self.pending.upgrade() else {
            return;
        };
        let waiters = pending.lock().remove(&self.kind).unwrap_or_default();

        let reported = self
            .provider
            .upgrade()
            .map(|p| p.authorization_status(self.kind))
            .unwrap_or(PermissionState::Undetermined);
        let state = match reported {
            PermissionState::Undetermined if granted => PermissionState::Authorized,
            PermissionState::Undetermined => PermissionState::Denied,
            settled => settled,
        };
        log::info!("{} capture authorization resolved: {:?}", self.kind, state);

        for waiter in waiters {
            waiter(state);
        }
    }
}

impl Drop for PromptGuard {
    fn drop(&mut self) {
        if self.answered {
            return;
        }
        if let Some(pending) = self.pending.upgrade() {
            let dropped = pending.lock().remove(&self.kind).map(|w| w.len()).unwrap_or(0);
            log::warn!(
                "{} authorization prompt dismissed without an answer, dropping {} waiter(s)",
                self.kind,
                dropped
            );
        }
    }
}

/// One-shot result of `PermissionGate::request_authorization`.
pub struct AuthorizationTicket {
    receiver: Receiver<PermissionState>,
}

impl AuthorizationTicket {
    /// The result if it has arrived.
    pub fn try_result(&self) -> Option<PermissionState> {
        match self.receiver.try_recv() {
            Ok(state) => Some(state),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Block until the result arrives. None if the prompt was dismissed unanswered.
    pub fn wait(self) -> Option<PermissionState> {
        self.receiver.recv().ok()
    }

    /// Block up to `timeout`. None on timeout or dismissal.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<PermissionState> {
        match self.receiver.recv_timeout(timeout) {
            Ok(state) => Some(state),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}
