/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! The credential store: holds the current rotation state and a lock-free-read
//! mirror of the most recently installed credentials.

use crate::credentials::ExpiringCredentials;
use crate::rotating::refresh::SharedRefresh;
use crate::rotating::scheduler::SchedulerTask;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

/// Stores a value in a RwLock and never holds the lock open across a section
/// of code that can panic in order to eliminate the PoisonedError.
#[derive(Clone)]
pub(crate) struct RwCell<T: Clone> {
    value: Arc<RwLock<T>>,
}

impl<T: Clone> RwCell<T> {
    pub(crate) fn new(initial: T) -> RwCell<T> {
        RwCell {
            value: Arc::new(RwLock::new(initial)),
        }
    }

    pub(crate) fn get(&self) -> T {
        self.value.read().expect("cannot be poisoned").clone()
    }

    pub(crate) fn set(&self, value: T) {
        *self.value.write().expect("cannot be poisoned") = value;
    }
}

/// Where the current credentials stand.
pub(crate) enum ProviderState {
    /// Usable credentials are held.
    Present(ExpiringCredentials),
    /// An on-demand refresh is in flight; new getters join it.
    Pending(SharedRefresh),
    /// The last on-demand refresh failed and no usable credentials remain.
    Missing,
}

/// Everything the rotation lock guards.
///
/// A single mutex covers the tagged state, the in-flight background refresh,
/// and the armed scheduler so that a getter's check-then-start sequence is
/// atomic: two concurrent getters can never both start a refresh.
pub(crate) struct RotationState {
    pub(crate) state: ProviderState,
    pub(crate) background: Option<SharedRefresh>,
    pub(crate) scheduler: Option<SchedulerTask>,
}

impl RotationState {
    pub(crate) fn disarm_scheduler(&mut self) {
        if let Some(task) = self.scheduler.take() {
            task.cancel();
        }
    }
}

pub(crate) struct CredentialStore {
    rotation: Mutex<RotationState>,
    /// Most recently installed credentials; read without taking the rotation
    /// lock so the synchronous snapshot accessor never waits on a refresh.
    latest: RwCell<Option<ExpiringCredentials>>,
}

impl CredentialStore {
    pub(crate) fn new(initial: ExpiringCredentials) -> Self {
        CredentialStore {
            rotation: Mutex::new(RotationState {
                state: ProviderState::Present(initial.clone()),
                background: None,
                scheduler: None,
            }),
            latest: RwCell::new(Some(initial)),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, RotationState> {
        self.rotation.lock().expect("cannot be poisoned")
    }

    /// Returns the most recently installed credentials without blocking on any
    /// in-flight refresh. `None` only after [`close`](Self::close).
    pub(crate) fn snapshot(&self) -> Option<ExpiringCredentials> {
        self.latest.get()
    }

    /// Installs `credentials` as current, superseding any pending tag.
    pub(crate) fn install(&self, rotation: &mut RotationState, credentials: ExpiringCredentials) {
        rotation.state = ProviderState::Present(credentials.clone());
        self.latest.set(Some(credentials));
    }

    /// Records that an on-demand refresh is in flight.
    pub(crate) fn begin_pending(&self, rotation: &mut RotationState, op: SharedRefresh) {
        rotation.state = ProviderState::Pending(op);
    }

    /// Records that the last on-demand refresh failed. The snapshot mirror is
    /// left intact so the legacy accessor keeps serving the last-installed
    /// value.
    pub(crate) fn mark_missing(&self, rotation: &mut RotationState) {
        rotation.state = ProviderState::Missing;
    }

    /// Tears the store down for shutdown: cancels the armed scheduler and any
    /// in-flight refresh, and clears the snapshot mirror.
    pub(crate) fn close(&self, rotation: &mut RotationState) {
        rotation.disarm_scheduler();
        if let Some(op) = rotation.background.take() {
            op.cancel();
        }
        if let ProviderState::Pending(op) =
            std::mem::replace(&mut rotation.state, ProviderState::Missing)
        {
            op.cancel();
        }
        self.latest.set(None);
    }
}
