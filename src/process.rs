/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Credentials retriever for an external helper process.
//!
//! Used in development builds to fetch role credentials through
//! `/usr/local/bin/get-credentials.sh`; the helper prints the standard JSON
//! credential payload on stdout.

use crate::credentials::ExpiringCredentials;
use crate::error::CredentialsError;
use crate::json_credentials::parse_credentials_payload;
use crate::retrieve::{future, RetrieveCredentials};
use crate::time::{SharedTimeSource, TimeSource};
use std::borrow::Cow;
use std::fmt;
use tokio::process::Command;

const DEV_CREDENTIALS_HELPER: &str = "/usr/local/bin/get-credentials.sh";
const DEV_SESSION_DURATION_SECS: u32 = 900;

/// Environment variable selecting the dev helper in debug builds.
pub(crate) const ENV_DEV_ROLE_ARN: &str = "DEV_CREDENTIALS_IAM_ROLE_ARN";

/// Credentials retriever that shells out to a helper process.
pub struct DevProcessCredentialsRetriever {
    command: String,
    time_source: SharedTimeSource,
}

/// Returns the given `command` string with arguments redacted if there were any
pub(crate) fn debug_fmt_command_string(command: &str) -> Cow<'_, str> {
    match command.find(char::is_whitespace) {
        Some(index) => Cow::Owned(format!("{} ** arguments redacted **", &command[0..index])),
        None => Cow::Borrowed(command),
    }
}

impl fmt::Debug for DevProcessCredentialsRetriever {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Security: the arguments for command must be redacted since they can be sensitive
        f.debug_struct("DevProcessCredentialsRetriever")
            .field("command", &debug_fmt_command_string(&self.command))
            .finish()
    }
}

impl DevProcessCredentialsRetriever {
    /// Creates a retriever invoking the dev credentials helper for `role_arn`.
    pub fn for_role(role_arn: &str) -> Self {
        Self::from_command(format!(
            "{} -r {} -d {}",
            DEV_CREDENTIALS_HELPER, role_arn, DEV_SESSION_DURATION_SECS
        ))
    }

    /// Creates a retriever invoking an arbitrary `command` through `sh -c`.
    pub fn from_command(command: impl Into<String>) -> Self {
        DevProcessCredentialsRetriever {
            command: command.into(),
            time_source: SharedTimeSource::default(),
        }
    }

    /// Overrides the time source used to validate payload expirations.
    pub fn with_time_source(mut self, time_source: SharedTimeSource) -> Self {
        self.time_source = time_source;
        self
    }

    async fn credentials(&self) -> Result<ExpiringCredentials, CredentialsError> {
        tracing::debug!(command = %debug_fmt_command_string(&self.command), "loading credentials from external process");

        let output = Command::new("sh")
            .args(["-c", &self.command])
            .output()
            .await
            .map_err(|err| {
                CredentialsError::retriever_transport(format!(
                    "failed to run credential helper: {}",
                    err
                ))
            })?;

        // Security: command arguments can be logged at trace level only
        tracing::trace!(command = %self.command, status = ?output.status, "executed credential helper (unredacted)");

        if !output.status.success() {
            let reason =
                std::str::from_utf8(&output.stderr).unwrap_or("could not decode stderr as UTF-8");
            return Err(CredentialsError::retriever_transport(format!(
                "credential helper exited with {}: {}",
                output.status, reason
            )));
        }

        parse_credentials_payload(&output.stdout, self.time_source.now())
            .map_err(CredentialsError::missing_credentials)
    }
}

impl RetrieveCredentials for DevProcessCredentialsRetriever {
    fn retrieve_credentials<'a>(&'a self) -> future::RetrieveCredentials<'a>
    where
        Self: 'a,
    {
        future::RetrieveCredentials::new(self.credentials())
    }
}

#[cfg(test)]
mod test {
    use super::{debug_fmt_command_string, DevProcessCredentialsRetriever};
    use crate::error::CredentialsError;
    use crate::retrieve::RetrieveCredentials;

    #[test]
    fn debug_redacts_arguments() {
        let retriever = DevProcessCredentialsRetriever::for_role("arn:aws:iam::123:role/dev");
        let debugged = format!("{:?}", retriever);
        assert!(!debugged.contains("arn:aws:iam::123:role/dev"));

        assert_eq!(debug_fmt_command_string("helper"), "helper");
        assert_eq!(
            debug_fmt_command_string("helper -r arn"),
            "helper ** arguments redacted **"
        );
    }

    #[tokio::test]
    async fn parses_helper_output() {
        let retriever = DevProcessCredentialsRetriever::from_command(
            r#"echo '{ "AccessKeyId": "ASIARTESTID", "SecretAccessKey": "TESTSECRETKEY", "Token": "TESTSESSIONTOKEN", "Expiration": "2100-01-01T00:00:00Z" }'"#,
        );
        let creds = retriever.retrieve_credentials().await.expect("valid creds");
        assert_eq!(creds.access_key_id(), "ASIARTESTID");
        assert_eq!(creds.secret_access_key(), "TESTSECRETKEY");
        assert_eq!(creds.session_token(), Some("TESTSESSIONTOKEN"));
        assert!(creds.expiration().is_some());
    }

    #[tokio::test]
    async fn helper_failure_is_a_transport_error() {
        let retriever =
            DevProcessCredentialsRetriever::from_command("echo 'broken' >&2; exit 7");
        let err = retriever
            .retrieve_credentials()
            .await
            .expect_err("helper failed");
        assert!(matches!(err, CredentialsError::RetrieverTransport { .. }));
        assert!(format!("{}", err).contains("broken"));
    }
}
