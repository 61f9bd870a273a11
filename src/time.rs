/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Time source abstraction so rotation deadlines are testable.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::SystemTime;

/// Trait with a `now()` function returning the current time.
pub trait TimeSource: Debug + Send + Sync {
    /// Returns the current time.
    fn now(&self) -> SystemTime;
}

/// Time source delegating to [`SystemTime::now`].
#[non_exhaustive]
#[derive(Debug, Default)]
pub struct SystemTimeSource;

impl SystemTimeSource {
    /// Creates a new `SystemTimeSource`.
    pub fn new() -> Self {
        SystemTimeSource
    }
}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Wrapper type for a shareable [`TimeSource`].
#[derive(Clone, Debug)]
pub struct SharedTimeSource(Arc<dyn TimeSource>);

impl SharedTimeSource {
    /// Creates a new `SharedTimeSource` from a [`TimeSource`].
    pub fn new(time_source: impl TimeSource + 'static) -> Self {
        SharedTimeSource(Arc::new(time_source))
    }
}

impl Default for SharedTimeSource {
    fn default() -> Self {
        SharedTimeSource::new(SystemTimeSource::new())
    }
}

impl TimeSource for SharedTimeSource {
    fn now(&self) -> SystemTime {
        self.0.now()
    }
}
