/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! The refresh coordinator: a single shared refresh operation that concurrent
//! callers join, with its outcome routed into the credential store.

use crate::credentials::ExpiringCredentials;
use crate::error::CredentialsError;
use crate::retrieve::RetrieveCredentials;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::Instrument;

use super::ProviderInner;

/// Which path initiated a refresh. The two paths route failures differently:
/// an on-demand failure surfaces to the caller and marks the store missing,
/// while a background failure is logged and the held credentials stay current.
#[derive(Clone, Copy, Debug)]
pub(crate) enum RefreshKind {
    OnDemand,
    Background,
}

type RefreshOutcome = Option<Result<ExpiringCredentials, CredentialsError>>;

/// A refresh operation that any number of callers can await.
///
/// The underlying retriever call runs in a spawned task; its result is
/// broadcast over a watch channel so every joined caller observes the same
/// credentials or the same error. Aborting the task drops the channel sender,
/// which waiters observe as [`CredentialsError::Cancelled`].
#[derive(Clone)]
pub(crate) struct SharedRefresh {
    outcome: watch::Receiver<RefreshOutcome>,
    abort: AbortHandle,
}

impl SharedRefresh {
    /// Spawns a refresh task. The caller must already hold the rotation lock
    /// and is responsible for recording the returned handle in the store.
    pub(crate) fn spawn(provider: Arc<ProviderInner>, kind: RefreshKind) -> SharedRefresh {
        let (tx, rx) = watch::channel(None);
        let handle = tokio::spawn(refresh_task(provider, kind, tx));
        SharedRefresh {
            outcome: rx,
            abort: handle.abort_handle(),
        }
    }

    /// Aborts the refresh. Waiters observe [`CredentialsError::Cancelled`].
    pub(crate) fn cancel(&self) {
        self.abort.abort();
    }

    /// Waits for the refresh to finish and returns its outcome.
    pub(crate) async fn join(&self) -> Result<ExpiringCredentials, CredentialsError> {
        let mut outcome = self.outcome.clone();
        loop {
            if let Some(result) = (*outcome.borrow_and_update()).clone() {
                return result;
            }
            if outcome.changed().await.is_err() {
                // The refresh task was aborted before producing an outcome.
                return Err(CredentialsError::Cancelled);
            }
        }
    }
}

async fn refresh_task(
    provider: Arc<ProviderInner>,
    kind: RefreshKind,
    tx: watch::Sender<RefreshOutcome>,
) {
    let span = tracing::info_span!(
        "refresh_credentials",
        kind = ?kind,
        session = provider.role_session_name.as_deref().unwrap_or_default(),
    );
    let result = provider
        .retriever
        .retrieve_credentials()
        .instrument(span)
        .await;
    provider.complete_refresh(kind, &result);
    let _ = tx.send(Some(result));
}
