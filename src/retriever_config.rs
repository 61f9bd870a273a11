/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Configuration options shared by credential retrievers.

use crate::os::Env;
use crate::time::SharedTimeSource;

/// Configuration options for credential retrievers.
///
/// Retriever builders offer a `configure` method which applies general
/// configuration options: the process environment, the time source used to
/// validate payload expirations, and the HTTP client.
///
/// The default configuration binds the real process environment, the system
/// clock, and a fresh HTTP client.
#[derive(Clone, Debug, Default)]
pub struct RetrieverConfig {
    env: Env,
    time_source: SharedTimeSource,
    http_client: Option<reqwest::Client>,
}

impl RetrieverConfig {
    /// Creates a config bound to the real process environment and system time.
    pub fn new() -> Self {
        Default::default()
    }

    pub(crate) fn env(&self) -> Env {
        self.env.clone()
    }

    pub(crate) fn time_source(&self) -> SharedTimeSource {
        self.time_source.clone()
    }

    pub(crate) fn http_client(&self) -> reqwest::Client {
        self.http_client.clone().unwrap_or_default()
    }

    /// Overrides the process environment.
    pub fn with_env(self, env: Env) -> Self {
        RetrieverConfig { env, ..self }
    }

    /// Overrides the time source.
    pub fn with_time_source(self, time_source: SharedTimeSource) -> Self {
        RetrieverConfig {
            time_source,
            ..self
        }
    }

    /// Overrides the HTTP client used by HTTP-backed retrievers.
    pub fn with_http_client(self, http_client: reqwest::Client) -> Self {
        RetrieverConfig {
            http_client: Some(http_client),
            ..self
        }
    }
}
