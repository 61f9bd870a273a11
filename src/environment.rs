/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Load credentials from the environment.

use crate::credentials::ExpiringCredentials;
use crate::error::CredentialsError;
use crate::retrieve::{future, RetrieveCredentials};
use crate::retriever_config::RetrieverConfig;
use crate::os::Env;

/// Load credentials from `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`, and
/// `AWS_SESSION_TOKEN`.
///
/// Environment credentials carry no expiration, so a rotating provider over
/// this retriever never schedules a background refresh.
#[derive(Debug)]
pub struct EnvironmentVariableCredentialsRetriever {
    env: Env,
}

impl Default for EnvironmentVariableCredentialsRetriever {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvironmentVariableCredentialsRetriever {
    /// Creates a retriever bound to the real process environment.
    pub fn new() -> Self {
        EnvironmentVariableCredentialsRetriever { env: Env::real() }
    }

    /// Creates a retriever bound to the environment in `config`.
    pub fn configure(config: &RetrieverConfig) -> Self {
        EnvironmentVariableCredentialsRetriever { env: config.env() }
    }

    fn credentials(&self) -> Result<ExpiringCredentials, CredentialsError> {
        let access_key_id = self.env.get("AWS_ACCESS_KEY_ID").map_err(|_| {
            CredentialsError::missing_credentials("AWS_ACCESS_KEY_ID is not set")
        })?;
        let secret_access_key = self.env.get("AWS_SECRET_ACCESS_KEY").map_err(|_| {
            CredentialsError::missing_credentials("AWS_SECRET_ACCESS_KEY is not set")
        })?;
        let session_token = self.env.get("AWS_SESSION_TOKEN").ok();
        tracing::debug!("loaded credentials from environment variables");
        Ok(ExpiringCredentials::from_keys(
            access_key_id,
            secret_access_key,
            session_token,
        ))
    }
}

impl RetrieveCredentials for EnvironmentVariableCredentialsRetriever {
    fn retrieve_credentials<'a>(&'a self) -> future::RetrieveCredentials<'a>
    where
        Self: 'a,
    {
        future::RetrieveCredentials::ready(self.credentials())
    }
}
