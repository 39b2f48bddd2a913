//! Scripted capture authorization.

use std::collections::HashMap;
use std::thread;

use parking_lot::Mutex;

use cappie_core::models::device::MediaKind;
use cappie_core::models::permission::PermissionState;
use cappie_core::traits::authorization_provider::{AccessCallback, AuthorizationProvider};

/// How `VirtualAuthorizer` answers prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptPolicy {
    /// Hold prompts until `resolve` or `dismiss` is called.
    Manual,
    /// Grant on a separate thread, the way a user clicking "Allow" would.
    AutoGrant,
    /// Deny on a separate thread.
    AutoDeny,
}

/// An `AuthorizationProvider` with per-kind status that starts undetermined.
pub struct VirtualAuthorizer {
    policy: PromptPolicy,
    statuses: Mutex<HashMap<MediaKind, PermissionState>>,
    prompts: Mutex<HashMap<MediaKind, usize>>,
    pending: Mutex<HashMap<MediaKind, Vec<AccessCallback>>>,
}

impl VirtualAuthorizer {
    pub fn new(policy: PromptPolicy) -> Self {
        Self {
            policy,
            statuses: Mutex::new(HashMap::new()),
            prompts: Mutex::new(HashMap::new()),
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_status(&self, kind: MediaKind, state: PermissionState) {
        self.statuses.lock().insert(kind, state);
    }

    /// Number of prompts shown for `kind`.
    pub fn prompt_count(&self, kind: MediaKind) -> usize {
        self.prompts.lock().get(&kind).copied().unwrap_or(0)
    }

    /// Answer every held prompt for `kind`.
    pub fn resolve(&self, kind: MediaKind, granted: bool) {
        self.record_answer(kind, granted);
        let callbacks = self.pending.lock().remove(&kind).unwrap_or_default();
        for callback in callbacks {
            callback(granted);
        }
    }

    /// Close every held prompt for `kind` without answering.
    pub fn dismiss(&self, kind: MediaKind) {
        let dropped = self.pending.lock().remove(&kind);
        drop(dropped);
    }

    fn record_answer(&self, kind: MediaKind, granted: bool) {
        let state = if granted {
            PermissionState::Authorized
        } else {
            PermissionState::Denied
        };
        self.set_status(kind, state);
    }
}

impl AuthorizationProvider for VirtualAuthorizer {
    fn authorization_status(&self, kind: MediaKind) -> PermissionState {
        self.statuses
            .lock()
            .get(&kind)
            .copied()
            .unwrap_or(PermissionState::Undetermined)
    }

    fn request_access(&self, kind: MediaKind, callback: AccessCallback) {
        *self.prompts.lock().entry(kind).or_default() += 1;

        let granted = match self.policy {
            PromptPolicy::Manual => {
                self.pending.lock().entry(kind).or_default().push(callback);
                return;
            }
            PromptPolicy::AutoGrant => true,
            PromptPolicy::AutoDeny => false,
        };

        self.record_answer(kind, granted);
        let spawned = thread::Builder::new()
            .name("cappie-authorization".into())
            .spawn(move || callback(granted));
        if let Err(e) = spawned {
            log::error!("Failed to deliver {} authorization answer: {}", kind, e);
        }
    }
}
