/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Credentials retriever backed by the AWS Security Token Service (STS).

use crate::credentials::ExpiringCredentials;
use crate::error::CredentialsError;
use crate::retrieve::{future, RetrieveCredentials};
use std::time::{Duration, SystemTime};
use tracing::Instrument;

const DEFAULT_SESSION_NAME: &str = "rotating-credentials-session";

/// The shortest session STS will grant.
const MIN_SESSION_DURATION: Duration = Duration::from_secs(900);
/// The longest session this retriever will request.
const MAX_SESSION_DURATION: Duration = Duration::from_secs(3600);

/// Credentials retriever that calls STS `AssumeRole`.
///
/// Every retrieval assumes the configured role and returns the temporary
/// credentials STS grants, including their expiration, so a rotating provider
/// over this retriever keeps re-assuming the role shortly before each session
/// expires.
#[derive(Debug)]
pub struct AssumeRoleRetriever {
    client: aws_sdk_sts::Client,
    role_arn: String,
    session_name: String,
    duration_seconds: Option<i32>,
}

impl AssumeRoleRetriever {
    /// Returns a builder for assuming `role_arn`.
    pub fn builder(role_arn: impl Into<String>) -> Builder {
        Builder {
            role_arn: role_arn.into(),
            client: None,
            session_name: None,
            duration: None,
        }
    }

    async fn credentials(&self) -> Result<ExpiringCredentials, CredentialsError> {
        let assumed = self
            .client
            .assume_role()
            .role_arn(&self.role_arn)
            .role_session_name(&self.session_name)
            .set_duration_seconds(self.duration_seconds)
            .send()
            .await
            .map_err(|err| CredentialsError::role_assumption_failed(&self.role_arn, err))?;
        let credentials = assumed.credentials.ok_or_else(|| {
            CredentialsError::role_assumption_failed(
                &self.role_arn,
                "STS response contained no credentials",
            )
        })?;
        let expiration = SystemTime::try_from(credentials.expiration().to_owned())
            .map_err(|err| CredentialsError::role_assumption_failed(&self.role_arn, err))?;
        tracing::info!(role_arn = %self.role_arn, expiration = ?expiration, "assumed role");
        Ok(ExpiringCredentials::new(
            credentials.access_key_id(),
            credentials.secret_access_key(),
            Some(credentials.session_token().to_string()),
            Some(expiration),
        ))
    }
}

impl RetrieveCredentials for AssumeRoleRetriever {
    fn retrieve_credentials<'a>(&'a self) -> future::RetrieveCredentials<'a>
    where
        Self: 'a,
    {
        let span = tracing::info_span!(
            "assume_role",
            role_arn = %self.role_arn,
            session = %self.session_name,
        );
        future::RetrieveCredentials::new(self.credentials().instrument(span))
    }
}

/// Builder for [`AssumeRoleRetriever`].
#[derive(Debug)]
pub struct Builder {
    role_arn: String,
    client: Option<aws_sdk_sts::Client>,
    session_name: Option<String>,
    duration: Option<Duration>,
}

impl Builder {
    /// Sets the STS client used to assume the role.
    pub fn sts_client(mut self, client: aws_sdk_sts::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Sets the role session name. Defaults to `rotating-credentials-session`.
    pub fn session_name(mut self, session_name: impl Into<String>) -> Self {
        self.session_name = Some(session_name.into());
        self
    }

    /// (Optional) Sets the requested session duration.
    ///
    /// When unset, STS applies its server-side default.
    pub fn session_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Builds the [`AssumeRoleRetriever`].
    ///
    /// # Panics
    ///
    /// Panics if no STS client was provided, or if the session duration is
    /// outside the 900 to 3600 second range STS accepts.
    pub fn build(self) -> AssumeRoleRetriever {
        if let Some(duration) = self.duration {
            assert!(
                (MIN_SESSION_DURATION..=MAX_SESSION_DURATION).contains(&duration),
                "session duration must be between 900 and 3600 seconds"
            );
        }
        AssumeRoleRetriever {
            client: self.client.expect("an STS client is required"),
            role_arn: self.role_arn,
            session_name: self
                .session_name
                .unwrap_or_else(|| DEFAULT_SESSION_NAME.to_string()),
            duration_seconds: self.duration.map(|duration| duration.as_secs() as i32),
        }
    }
}
