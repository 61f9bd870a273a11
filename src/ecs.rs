/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Credentials retriever for the ECS container metadata endpoint.

use crate::credentials::ExpiringCredentials;
use crate::error::CredentialsError;
use crate::json_credentials::parse_credentials_payload;
use crate::retrieve::{future, RetrieveCredentials};
use crate::retriever_config::RetrieverConfig;
use crate::time::{SharedTimeSource, TimeSource};
use reqwest::header::{ACCEPT, CONTENT_LENGTH, HOST, USER_AGENT};

/// Environment variable naming the credential path on the container endpoint.
pub(crate) const ENV_RELATIVE_URI: &str = "AWS_CONTAINER_CREDENTIALS_RELATIVE_URI";

const ECS_HOST: &str = "169.254.170.2";
const ECS_ENDPOINT: &str = "http://169.254.170.2";
const CRATE_USER_AGENT: &str =
    concat!("aws-rotating-credentials/", env!("CARGO_PKG_VERSION"));

/// Credentials retriever backed by the ECS container metadata endpoint.
///
/// Issues `GET http://169.254.170.2<path>` where `<path>` comes from
/// `AWS_CONTAINER_CREDENTIALS_RELATIVE_URI`, and decodes the JSON credential
/// payload from the response body. A non-2xx response is a transport error.
#[derive(Debug)]
pub struct EcsCredentialsRetriever {
    uri: String,
    client: reqwest::Client,
    time_source: SharedTimeSource,
}

impl EcsCredentialsRetriever {
    /// Returns a builder for `EcsCredentialsRetriever`.
    pub fn builder() -> Builder {
        Builder::default()
    }

    async fn credentials(&self) -> Result<ExpiringCredentials, CredentialsError> {
        tracing::debug!(uri = %self.uri, "loading credentials from the container endpoint");
        let response = self
            .client
            .get(&self.uri)
            .header(USER_AGENT, CRATE_USER_AGENT)
            .header(HOST, ECS_HOST)
            .header(ACCEPT, "*/*")
            .header(CONTENT_LENGTH, "0")
            .send()
            .await
            .map_err(CredentialsError::retriever_transport)?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(CredentialsError::retriever_transport)?;
        if !status.is_success() {
            return Err(CredentialsError::retriever_transport(format!(
                "container endpoint returned {}",
                status
            )));
        }
        parse_credentials_payload(&body, self.time_source.now())
            .map_err(CredentialsError::missing_credentials)
    }
}

impl RetrieveCredentials for EcsCredentialsRetriever {
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
        // The connection pool is released when the retriever is dropped.
        tracing::trace!("container endpoint retriever shut down");
        future::Shutdown::ready(Ok(()))
    }
}

/// Builder for [`EcsCredentialsRetriever`].
#[derive(Debug, Default)]
pub struct Builder {
    relative_uri: Option<String>,
    endpoint: Option<String>,
    config: Option<RetrieverConfig>,
}

impl Builder {
    /// Overrides the credential path instead of reading
    /// `AWS_CONTAINER_CREDENTIALS_RELATIVE_URI`.
    pub fn relative_uri(mut self, relative_uri: impl Into<String>) -> Self {
        self.relative_uri = Some(relative_uri.into());
        self
    }

    /// Overrides the endpoint base, e.g. to point at a local stand-in.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Applies general retriever configuration options.
    pub fn configure(mut self, config: &RetrieverConfig) -> Self {
        self.config = Some(config.clone());
        self
    }

    /// Builds the retriever.
    ///
    /// Fails with [`CredentialsError::MissingCredentials`] if no relative URI
    /// was given and `AWS_CONTAINER_CREDENTIALS_RELATIVE_URI` is not set.
    pub fn build(self) -> Result<EcsCredentialsRetriever, CredentialsError> {
        let config = self.config.unwrap_or_default();
        let relative_uri = match self.relative_uri {
            Some(relative_uri) => relative_uri,
            None => config.env().get(ENV_RELATIVE_URI).map_err(|_| {
                CredentialsError::missing_credentials(format!("{} is not set", ENV_RELATIVE_URI))
            })?,
        };
        let endpoint = self.endpoint.as_deref().unwrap_or(ECS_ENDPOINT);
        Ok(EcsCredentialsRetriever {
            uri: container_uri(endpoint, &relative_uri),
            client: config.http_client(),
            time_source: config.time_source(),
        })
    }
}

/// Joins the endpoint base and the relative path, inserting a leading slash
/// if the path lacks one.
fn container_uri(endpoint: &str, relative_uri: &str) -> String {
    if relative_uri.starts_with('/') {
        format!("{}{}", endpoint, relative_uri)
    } else {
        format!("{}/{}", endpoint, relative_uri)
    }
}

#[cfg(test)]
mod test {
    use super::{container_uri, EcsCredentialsRetriever, ECS_ENDPOINT};
    use crate::error::CredentialsError;
    use crate::os::Env;
    use crate::retriever_config::RetrieverConfig;

    #[test]
    fn leading_slash_is_inserted() {
        assert_eq!(
            container_uri(ECS_ENDPOINT, "v2/credentials"),
            "http://169.254.170.2/v2/credentials"
        );
        assert_eq!(
            container_uri(ECS_ENDPOINT, "/v2/credentials"),
            "http://169.254.170.2/v2/credentials"
        );
    }

    #[test]
    fn relative_uri_resolved_from_environment() {
        let config = RetrieverConfig::new()
            .with_env(Env::from_slice(&[(super::ENV_RELATIVE_URI, "v2/creds")]));
        let retriever = EcsCredentialsRetriever::builder()
            .configure(&config)
            .build()
            .expect("relative uri is set");
        assert_eq!(retriever.uri, "http://169.254.170.2/v2/creds");
    }

    #[test]
    fn missing_relative_uri_fails() {
        let config = RetrieverConfig::new().with_env(Env::from_slice(&[]));
        let err = EcsCredentialsRetriever::builder()
            .configure(&config)
            .build()
            .expect_err("no relative uri");
        assert!(matches!(err, CredentialsError::MissingCredentials { .. }));
    }
}
