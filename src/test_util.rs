/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Test time/sleep implementations driven by manually advancing time with
//! `tick()`, plus a scripted retriever that records its invocations.

use crate::credentials::ExpiringCredentials;
use crate::error::CredentialsError;
use crate::retrieve::{future, RetrieveCredentials};
use crate::sleep::{AsyncSleep, Sleep};
use crate::time::TimeSource;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use tokio::sync::oneshot;
use tokio::sync::Semaphore;

struct QueuedSleep {
    wakes_at: Duration,
    notify: oneshot::Sender<()>,
}

#[derive(Default)]
struct ClockInner {
    now: Duration,
    sleeps: Vec<QueuedSleep>,
}

/// Tick-advancing test time source. Starts at `SystemTime::UNIX_EPOCH`.
#[derive(Clone, Debug, Default)]
pub(crate) struct TickAdvanceTime {
    inner: Arc<Mutex<ClockInner>>,
}

/// Tick-advancing test sleep implementation paired with [`TickAdvanceTime`].
#[derive(Clone, Debug, Default)]
pub(crate) struct TickAdvanceSleep {
    inner: Arc<Mutex<ClockInner>>,
}

impl std::fmt::Debug for ClockInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClockInner")
            .field("now", &self.now)
            .field("sleeps", &self.sleeps.len())
            .finish()
    }
}

impl TickAdvanceTime {
    /// Advances time by `duration`, firing every queued sleep that presents
    /// within the window. Sleeps fire earliest-first, with the runtime yielded
    /// after each one so the woken task can queue follow-up sleeps that also
    /// fall inside the window.
    pub(crate) async fn tick(&self, duration: Duration) {
        let target = self.inner.lock().unwrap().now + duration;
        loop {
            let next = {
                let mut inner = self.inner.lock().unwrap();
                let due = inner
                    .sleeps
                    .iter()
                    .enumerate()
                    .filter(|(_, sleep)| sleep.wakes_at <= target)
                    .min_by_key(|(_, sleep)| sleep.wakes_at)
                    .map(|(index, _)| index);
                match due {
                    Some(index) => {
                        let sleep = inner.sleeps.swap_remove(index);
                        inner.now = inner.now.max(sleep.wakes_at);
                        Some(sleep)
                    }
                    None => None,
                }
            };
            match next {
                Some(sleep) => {
                    let _ = sleep.notify.send(());
                    for _ in 0..4 {
                        tokio::task::yield_now().await;
                    }
                }
                None => break,
            }
        }
        self.inner.lock().unwrap().now = target;
        tokio::task::yield_now().await;
    }

    /// Number of sleeps currently queued.
    pub(crate) fn queued_sleeps(&self) -> usize {
        self.inner.lock().unwrap().sleeps.len()
    }
}

impl TimeSource for TickAdvanceTime {
    fn now(&self) -> SystemTime {
        SystemTime::UNIX_EPOCH + self.inner.lock().unwrap().now
    }
}

impl AsyncSleep for TickAdvanceSleep {
    fn sleep(&self, duration: Duration) -> Sleep {
        let (tx, rx) = oneshot::channel();
        {
            let mut inner = self.inner.lock().unwrap();
            let wakes_at = inner.now + duration;
            inner.sleeps.push(QueuedSleep {
                wakes_at,
                notify: tx,
            });
        }
        Sleep::new(async move {
            let _ = rx.await;
        })
    }
}

/// Creates paired tick-advancing time/sleep implementations.
pub(crate) fn tick_advance_time_and_sleep() -> (TickAdvanceTime, TickAdvanceSleep) {
    let inner = Arc::new(Mutex::new(ClockInner::default()));
    (
        TickAdvanceTime {
            inner: inner.clone(),
        },
        TickAdvanceSleep { inner },
    )
}

struct ScriptedInner {
    script: Mutex<VecDeque<Result<ExpiringCredentials, CredentialsError>>>,
    calls: AtomicUsize,
    shutdown_calls: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
}

/// A retriever that plays back a scripted list of results and records how
/// many times it was invoked.
#[derive(Clone)]
pub(crate) struct ScriptedRetriever(Arc<ScriptedInner>);

/// Holds a gated [`ScriptedRetriever`]'s retrievals until opened.
pub(crate) struct RetrieverGate(Arc<Semaphore>);

impl RetrieverGate {
    /// Allows `permits` more retrievals to complete.
    pub(crate) fn open(&self, permits: usize) {
        self.0.add_permits(permits);
    }
}

impl ScriptedRetriever {
    pub(crate) fn new(script: Vec<Result<ExpiringCredentials, CredentialsError>>) -> Self {
        ScriptedRetriever(Arc::new(ScriptedInner {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
            shutdown_calls: AtomicUsize::new(0),
            gate: None,
        }))
    }

    /// Creates a retriever whose every retrieval blocks until the returned
    /// gate grants it a permit.
    pub(crate) fn gated(
        script: Vec<Result<ExpiringCredentials, CredentialsError>>,
    ) -> (Self, RetrieverGate) {
        let gate = Arc::new(Semaphore::new(0));
        let retriever = ScriptedRetriever(Arc::new(ScriptedInner {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
            shutdown_calls: AtomicUsize::new(0),
            gate: Some(gate.clone()),
        }));
        (retriever, RetrieverGate(gate))
    }

    /// Number of retrievals started so far.
    pub(crate) fn calls(&self) -> usize {
        self.0.calls.load(Ordering::SeqCst)
    }

    /// Number of times `shutdown` was invoked.
    pub(crate) fn shutdown_calls(&self) -> usize {
        self.0.shutdown_calls.load(Ordering::SeqCst)
    }

    async fn next(&self) -> Result<ExpiringCredentials, CredentialsError> {
        self.0.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.0.gate {
            gate.acquire().await.expect("gate never closes").forget();
        }
        self.0
            .script
            .lock()
            .unwrap()
            .pop_front()
            .expect("retriever script is not exhausted")
    }
}

impl RetrieveCredentials for ScriptedRetriever {
    fn retrieve_credentials<'a>(&'a self) -> future::RetrieveCredentials<'a>
    where
        Self: 'a,
    {
        future::RetrieveCredentials::new(self.next())
    }

    fn shutdown<'a>(&'a self) -> future::Shutdown<'a>
    where
        Self: 'a,
    {
        self.0.shutdown_calls.fetch_add(1, Ordering::SeqCst);
        future::Shutdown::ready(Ok(()))
    }
}

#[cfg(test)]
mod test {
    use super::tick_advance_time_and_sleep;
    use crate::sleep::AsyncSleep;
    use crate::time::TimeSource;
    use std::time::{Duration, SystemTime};

    #[tokio::test]
    async fn tick_fires_sleeps_in_order() {
        let (time, sleep) = tick_advance_time_and_sleep();
        assert_eq!(SystemTime::UNIX_EPOCH, time.now());

        let first = tokio::spawn(sleep.sleep(Duration::from_secs(1)));
        let second = tokio::spawn(sleep.sleep(Duration::from_secs(3)));
        tokio::task::yield_now().await;
        assert!(!first.is_finished());

        time.tick(Duration::from_secs(2)).await;
        assert!(first.is_finished());
        assert!(!second.is_finished());
        assert_eq!(SystemTime::UNIX_EPOCH + Duration::from_secs(2), time.now());

        time.tick(Duration::from_secs(2)).await;
        assert!(second.is_finished());
    }

    #[tokio::test]
    async fn chained_sleeps_complete_in_one_tick() {
        let (time, sleep) = tick_advance_time_and_sleep();
        let task = tokio::spawn(async move {
            sleep.sleep(Duration::from_secs(1)).await;
            sleep.sleep(Duration::from_secs(2)).await;
        });
        tokio::task::yield_now().await;
        assert!(!task.is_finished());

        time.tick(Duration::from_secs(4)).await;
        task.await.expect("both sleeps fired");
    }
}
