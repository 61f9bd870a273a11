/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! The rotation scheduler: sleeps until shortly before the held credentials
//! expire, then hands control to the refresh coordinator.

use crate::sleep::AsyncSleep;
use crate::time::TimeSource;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::task::AbortHandle;

use super::ProviderInner;

/// Handle to an armed scheduler task.
///
/// At most one exists per provider. Cancellation drops the pending fire
/// without firing; a cancelled task never reaches the refresh coordinator.
pub(crate) struct SchedulerTask {
    abort: AbortHandle,
}

impl SchedulerTask {
    pub(crate) fn cancel(&self) {
        self.abort.abort();
    }
}

/// How long to wait before firing a background refresh for credentials that
/// expire at `expiration`. A deadline already in the past fires immediately.
pub(crate) fn rotation_delay(
    now: SystemTime,
    expiration: SystemTime,
    background_buffer: Duration,
) -> Duration {
    let deadline = match expiration.checked_sub(background_buffer) {
        Some(deadline) => deadline,
        None => return Duration::ZERO,
    };
    deadline.duration_since(now).unwrap_or(Duration::ZERO)
}

/// Arms a scheduler task for credentials expiring at `expiration`.
///
/// The task holds only a weak reference to the provider, so an armed scheduler
/// never keeps a dropped provider alive; if the provider is gone by the time
/// the sleep elapses, the fire is dropped.
pub(crate) fn arm(provider: &Arc<ProviderInner>, expiration: SystemTime) -> SchedulerTask {
    let delay = rotation_delay(
        provider.time_source.now(),
        expiration,
        provider.background_buffer,
    );
    tracing::debug!(delay = ?delay, "armed background rotation");
    let sleep = provider.sleep_impl.sleep(delay);
    let weak = Arc::downgrade(provider);
    let handle = tokio::spawn(async move {
        sleep.await;
        if let Some(provider) = weak.upgrade() {
            provider.fire_background_refresh();
        }
    });
    SchedulerTask {
        abort: handle.abort_handle(),
    }
}
