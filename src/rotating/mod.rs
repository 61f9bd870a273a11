/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! A credentials provider that keeps short-lived credentials fresh.
//!
//! [`RotatingCredentialsProvider`] wraps a [`RetrieveCredentials`]
//! implementation and serves its most recent result, refreshing it two ways:
//!
//! - a **background** refresh fires shortly before the held credentials
//!   expire (the background buffer, 300 s by default), so callers keep
//!   receiving valid credentials without ever waiting on the retriever;
//! - an **on-demand** refresh runs when a caller finds the held credentials
//!   within the expiration buffer (120 s by default). Concurrent callers are
//!   coalesced onto a single retriever call and all observe the same outcome.
//!
//! Background failures are logged and suppressed while the held credentials
//! remain valid; they are not retried on a timer. Instead, the next on-demand
//! call takes over once the credentials enter the expiration buffer.
//! On-demand failures surface to the caller.

mod refresh;
mod scheduler;
mod store;

use crate::credentials::ExpiringCredentials;
use crate::error::CredentialsError;
use crate::retrieve::{future, RetrieveCredentials, SharedCredentialsRetriever};
use crate::sleep::SharedAsyncSleep;
use crate::time::{SharedTimeSource, TimeSource};
use refresh::{RefreshKind, SharedRefresh};
use std::sync::Arc;
use std::time::Duration;
use store::{CredentialStore, ProviderState};
use tokio::sync::watch;

/// How close to its expiration a held credential may be before `credentials()`
/// stops returning it and forces a refresh.
pub const DEFAULT_EXPIRATION_BUFFER: Duration = Duration::from_secs(120);

/// How long before the held credentials expire the background refresh fires.
pub const DEFAULT_BACKGROUND_BUFFER: Duration = Duration::from_secs(300);

/// Lifecycle of a [`RotatingCredentialsProvider`].
///
/// Transitions are monotonic; `Stopped` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderStatus {
    /// Constructed with initial credentials; background rotation not yet armed.
    Initialized,
    /// Background rotation is active.
    Running,
    /// Shutdown has begun; in-flight work is being cancelled.
    ShuttingDown,
    /// Shutdown finished. No further credentials will be served.
    Stopped,
}

pub(crate) struct ProviderInner {
    retriever: SharedCredentialsRetriever,
    store: CredentialStore,
    pub(crate) time_source: SharedTimeSource,
    pub(crate) sleep_impl: SharedAsyncSleep,
    expiration_buffer: Duration,
    pub(crate) background_buffer: Duration,
    pub(crate) role_session_name: Option<String>,
    status: watch::Sender<ProviderStatus>,
}

impl ProviderInner {
    fn status(&self) -> ProviderStatus {
        *self.status.borrow()
    }

    fn is_fresh(&self, credentials: &ExpiringCredentials) -> bool {
        match credentials.expiration() {
            None => true,
            Some(expiration) => expiration > self.time_source.now() + self.expiration_buffer,
        }
    }

    /// The on-demand path: fast-path a fresh held value, otherwise join or
    /// start a refresh and await its outcome.
    async fn on_demand_credentials(
        self: &Arc<Self>,
    ) -> Result<ExpiringCredentials, CredentialsError> {
        if let ProviderStatus::ShuttingDown | ProviderStatus::Stopped = self.status() {
            return Err(CredentialsError::ProviderShutDown);
        }
        let op = {
            let mut rotation = self.store.lock();
            if let ProviderState::Present(credentials) = &rotation.state {
                if self.is_fresh(credentials) {
                    tracing::trace!("returning held credentials");
                    return Ok(credentials.clone());
                }
            }
            if let Some(op) = &rotation.background {
                // The held credentials are already inside the expiration
                // buffer; ride the background refresh that is in flight.
                tracing::debug!("joining in-flight background refresh");
                op.clone()
            } else if let ProviderState::Pending(op) = &rotation.state {
                tracing::debug!("joining in-flight on-demand refresh");
                op.clone()
            } else {
                tracing::debug!("held credentials are stale; starting on-demand refresh");
                rotation.disarm_scheduler();
                let op = SharedRefresh::spawn(self.clone(), RefreshKind::OnDemand);
                self.store.begin_pending(&mut rotation, op.clone());
                op
            }
        };
        op.join().await
    }

    /// Entry point for the scheduler. Skipped when an on-demand refresh has
    /// taken over; the refresh runs without tagging the store `Pending`, so
    /// callers keep receiving the still-valid held credentials.
    pub(crate) fn fire_background_refresh(self: &Arc<Self>) {
        if let ProviderStatus::ShuttingDown | ProviderStatus::Stopped = self.status() {
            return;
        }
        let mut rotation = self.store.lock();
        rotation.scheduler = None;
        if !matches!(rotation.state, ProviderState::Present(_)) {
            return;
        }
        if rotation.background.is_some() {
            return;
        }
        tracing::debug!("rotation deadline reached; refreshing in the background");
        rotation.background = Some(SharedRefresh::spawn(self.clone(), RefreshKind::Background));
    }

    /// Routes a finished refresh into the store and re-arms the scheduler.
    pub(crate) fn complete_refresh(
        self: &Arc<Self>,
        kind: RefreshKind,
        result: &Result<ExpiringCredentials, CredentialsError>,
    ) {
        let mut rotation = self.store.lock();
        if let RefreshKind::Background = kind {
            rotation.background = None;
        }
        let status = self.status();
        if let ProviderStatus::ShuttingDown | ProviderStatus::Stopped = status {
            // Shutdown already tore the store down; drop the outcome.
            return;
        }
        match result {
            Ok(credentials) => {
                rotation.disarm_scheduler();
                self.store.install(&mut rotation, credentials.clone());
                if status == ProviderStatus::Running {
                    if let Some(expiration) = credentials.expiration() {
                        rotation.scheduler = Some(scheduler::arm(self, expiration));
                    }
                }
                tracing::info!(
                    expiration = ?credentials.expiration(),
                    "installed refreshed credentials"
                );
            }
            Err(err) => match kind {
                RefreshKind::OnDemand => {
                    // The error surfaces to every joined caller; the next call
                    // starts a fresh attempt instead of reusing this one.
                    self.store.mark_missing(&mut rotation);
                    tracing::debug!(error = %err, "on-demand credential refresh failed");
                }
                RefreshKind::Background => {
                    let held_expired = match &rotation.state {
                        ProviderState::Present(held) => held.expires_by(self.time_source.now()),
                        _ => false,
                    };
                    if held_expired {
                        tracing::error!(
                            error = %err,
                            "background credential refresh failed and the held credentials are expired"
                        );
                    } else {
                        tracing::warn!(
                            error = %err,
                            "background credential refresh failed; continuing with held credentials"
                        );
                    }
                }
            },
        }
    }
}

/// A provider of short-lived credentials that refreshes them before they
/// expire.
///
/// Construct with [`builder()`](RotatingCredentialsProvider::builder), which
/// performs an initial fetch so a provider always starts with usable
/// credentials, then call [`start()`](RotatingCredentialsProvider::start) to
/// arm background rotation. Shut the provider down before dropping it.
///
/// See the [module docs](self) for the refresh model.
pub struct RotatingCredentialsProvider {
    inner: Arc<ProviderInner>,
}

impl RotatingCredentialsProvider {
    /// Returns a builder for `RotatingCredentialsProvider`.
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Returns the held credentials, refreshing them first if they are within
    /// the expiration buffer.
    ///
    /// Suspends only when a refresh is required or already in flight; callers
    /// holding still-valid credentials are never blocked by a background
    /// refresh. Concurrent callers that all observe stale credentials join a
    /// single retriever call and receive the same outcome.
    pub async fn credentials(&self) -> Result<ExpiringCredentials, CredentialsError> {
        self.inner.on_demand_credentials().await
    }

    /// Returns the most recently installed credentials without suspending.
    ///
    /// Serves the last-installed value even while a refresh is in flight or
    /// after an on-demand refresh has failed; fails with
    /// [`CredentialsError::ProviderShutDown`] once the provider is shut down.
    pub fn current_credentials(&self) -> Result<ExpiringCredentials, CredentialsError> {
        if let ProviderStatus::ShuttingDown | ProviderStatus::Stopped = self.inner.status() {
            return Err(CredentialsError::ProviderShutDown);
        }
        self.inner
            .store
            .snapshot()
            .ok_or(CredentialsError::ProviderShutDown)
    }

    /// Arms background rotation if the current credentials carry an
    /// expiration. No-op unless the provider is `Initialized`.
    pub fn start(&self) {
        let started = self.inner.status.send_if_modified(|status| {
            if *status == ProviderStatus::Initialized {
                *status = ProviderStatus::Running;
                true
            } else {
                false
            }
        });
        if !started {
            return;
        }
        let mut rotation = self.inner.store.lock();
        if let ProviderState::Present(credentials) = &rotation.state {
            if let Some(expiration) = credentials.expiration() {
                rotation.scheduler = Some(scheduler::arm(&self.inner, expiration));
            }
        }
        tracing::debug!("rotating credentials provider started");
    }

    /// Shuts the provider down: cancels the scheduler and any in-flight
    /// refresh, shuts the retriever down, and releases every
    /// [`wait()`](RotatingCredentialsProvider::wait) caller.
    ///
    /// Idempotent: later calls (and concurrent callers that lose the race)
    /// simply wait for the shutdown to finish. A retriever shutdown error is
    /// returned but does not prevent the transition to `Stopped`.
    pub async fn shutdown(&self) -> Result<(), CredentialsError> {
        let initiated = self.inner.status.send_if_modified(|status| match status {
            ProviderStatus::Initialized | ProviderStatus::Running => {
                *status = ProviderStatus::ShuttingDown;
                true
            }
            ProviderStatus::ShuttingDown | ProviderStatus::Stopped => false,
        });
        if !initiated {
            self.wait().await;
            return Ok(());
        }
        tracing::info!("shutting down rotating credentials provider");
        {
            let mut rotation = self.inner.store.lock();
            self.inner.store.close(&mut rotation);
        }
        let result = self.inner.retriever.shutdown().await;
        self.inner.status.send_replace(ProviderStatus::Stopped);
        result
    }

    /// Waits until the provider reaches `Stopped`. If
    /// [`shutdown()`](RotatingCredentialsProvider::shutdown) is never called,
    /// waits forever.
    pub async fn wait(&self) {
        let mut status = self.inner.status.subscribe();
        loop {
            if *status.borrow_and_update() == ProviderStatus::Stopped {
                return;
            }
            if status.changed().await.is_err() {
                return;
            }
        }
    }

    /// Returns the current lifecycle status.
    pub fn status(&self) -> ProviderStatus {
        self.inner.status()
    }
}

impl RetrieveCredentials for RotatingCredentialsProvider {
    fn retrieve_credentials<'a>(&'a self) -> future::RetrieveCredentials<'a>
    where
        Self: 'a,
    {
        future::RetrieveCredentials::new(self.credentials())
    }

    fn shutdown<'a>(&'a self) -> future::Shutdown<'a>
    where
        Self: 'a,
    {
        future::Shutdown::new(self.shutdown())
    }
}

/// Builder for [`RotatingCredentialsProvider`].
#[derive(Default)]
pub struct Builder {
    retriever: Option<SharedCredentialsRetriever>,
    expiration_buffer: Option<Duration>,
    background_buffer: Option<Duration>,
    role_session_name: Option<String>,
    time_source: Option<SharedTimeSource>,
    sleep_impl: Option<SharedAsyncSleep>,
}

impl Builder {
    /// The [`RetrieveCredentials`] implementation that fetches fresh
    /// credentials. Required.
    pub fn retriever(mut self, retriever: impl RetrieveCredentials + 'static) -> Self {
        self.retriever = Some(SharedCredentialsRetriever::new(retriever));
        self
    }

    /// (Optional) The staleness threshold for
    /// [`credentials()`](RotatingCredentialsProvider::credentials).
    /// Defaults to 120 seconds.
    pub fn expiration_buffer(mut self, buffer: Duration) -> Self {
        self.expiration_buffer = Some(buffer);
        self
    }

    /// (Optional) The lead time before expiration at which the background
    /// refresh fires. Defaults to 300 seconds.
    pub fn background_buffer(mut self, buffer: Duration) -> Self {
        self.background_buffer = Some(buffer);
        self
    }

    /// (Optional) A session name included in refresh log spans.
    pub fn role_session_name(mut self, name: impl Into<String>) -> Self {
        self.role_session_name = Some(name.into());
        self
    }

    /// (Optional) Overrides the time source. Defaults to the system clock.
    pub fn time_source(mut self, time_source: SharedTimeSource) -> Self {
        self.time_source = Some(time_source);
        self
    }

    /// (Optional) Overrides the sleep implementation used by the rotation
    /// scheduler. Defaults to the Tokio timer.
    pub fn sleep_impl(mut self, sleep_impl: SharedAsyncSleep) -> Self {
        self.sleep_impl = Some(sleep_impl);
        self
    }

    /// Performs the initial fetch and creates the provider.
    ///
    /// Fails with the retriever's own error if the initial fetch does, so a
    /// successfully-built provider always holds usable credentials.
    ///
    /// # Panics
    ///
    /// Panics if no retriever was provided.
    pub async fn build(self) -> Result<RotatingCredentialsProvider, CredentialsError> {
        let retriever = self.retriever.expect("a credentials retriever is required");
        let initial = retriever.retrieve_credentials().await?;
        tracing::info!(expiration = ?initial.expiration(), "loaded initial credentials");
        let (status, _) = watch::channel(ProviderStatus::Initialized);
        Ok(RotatingCredentialsProvider {
            inner: Arc::new(ProviderInner {
                retriever,
                store: CredentialStore::new(initial),
                time_source: self.time_source.unwrap_or_default(),
                sleep_impl: self.sleep_impl.unwrap_or_default(),
                expiration_buffer: self.expiration_buffer.unwrap_or(DEFAULT_EXPIRATION_BUFFER),
                background_buffer: self.background_buffer.unwrap_or(DEFAULT_BACKGROUND_BUFFER),
                role_session_name: self.role_session_name,
                status,
            }),
        })
    }
}
