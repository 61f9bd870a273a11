/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Environment discovery: picks the credential retriever for this process.

use crate::ecs::{self, EcsCredentialsRetriever};
use crate::environment::EnvironmentVariableCredentialsRetriever;
use crate::error::CredentialsError;
use crate::os::Env;
use crate::process::{self, DevProcessCredentialsRetriever};
use crate::retrieve::{future, RetrieveCredentials, SharedCredentialsRetriever};
use crate::retriever_config::RetrieverConfig;

#[derive(Debug, PartialEq, Eq)]
enum CredentialSource {
    Container,
    Environment,
    DevProcess,
    None,
}

fn detect_source(env: &Env, dev_helper_allowed: bool) -> CredentialSource {
    if env.get(ecs::ENV_RELATIVE_URI).is_ok() {
        CredentialSource::Container
    } else if env.get("AWS_ACCESS_KEY_ID").is_ok() {
        CredentialSource::Environment
    } else if dev_helper_allowed && env.get(process::ENV_DEV_ROLE_ARN).is_ok() {
        CredentialSource::DevProcess
    } else {
        CredentialSource::None
    }
}

/// Selects a credential retriever from the process environment.
///
/// Checked in order: `AWS_CONTAINER_CREDENTIALS_RELATIVE_URI` selects the
/// container endpoint retriever; `AWS_ACCESS_KEY_ID` selects the static
/// environment retriever; in debug builds, `DEV_CREDENTIALS_IAM_ROLE_ARN`
/// selects the dev helper subprocess. When no source is configured the
/// returned retriever fails every call with
/// [`CredentialsError::MissingCredentials`].
pub fn default_retriever(config: &RetrieverConfig) -> SharedCredentialsRetriever {
    let env = config.env();
    match detect_source(&env, cfg!(debug_assertions)) {
        CredentialSource::Container => {
            tracing::info!("using the container endpoint credential source");
            let retriever = EcsCredentialsRetriever::builder()
                .configure(config)
                .build()
                .expect("relative URI env var was just observed");
            SharedCredentialsRetriever::new(retriever)
        }
        CredentialSource::Environment => {
            tracing::info!("using the environment variable credential source");
            SharedCredentialsRetriever::new(EnvironmentVariableCredentialsRetriever::configure(
                config,
            ))
        }
        CredentialSource::DevProcess => {
            let role_arn = env
                .get(process::ENV_DEV_ROLE_ARN)
                .expect("dev role env var was just observed");
            tracing::info!("using the dev helper credential source");
            SharedCredentialsRetriever::new(
                DevProcessCredentialsRetriever::for_role(&role_arn)
                    .with_time_source(config.time_source()),
            )
        }
        CredentialSource::None => {
            tracing::info!("no credential source detected in the environment");
            SharedCredentialsRetriever::new(NoSourceCredentials)
        }
    }
}

/// Terminal retriever used when discovery finds no configured source.
#[derive(Debug)]
struct NoSourceCredentials;

impl RetrieveCredentials for NoSourceCredentials {
    fn retrieve_credentials<'a>(&'a self) -> future::RetrieveCredentials<'a>
    where
        Self: 'a,
    {
        future::RetrieveCredentials::ready(Err(CredentialsError::missing_credentials(
            "no credential source was detected in the environment",
        )))
    }
}

#[cfg(test)]
mod test {
    use super::{detect_source, CredentialSource};
    use crate::os::Env;

    #[test]
    fn container_endpoint_wins() {
        let env = Env::from_slice(&[
            ("AWS_CONTAINER_CREDENTIALS_RELATIVE_URI", "/v2/creds"),
            ("AWS_ACCESS_KEY_ID", "AKIDEXAMPLE"),
        ]);
        assert_eq!(detect_source(&env, true), CredentialSource::Container);
    }

    #[test]
    fn environment_keys_beat_dev_helper() {
        let env = Env::from_slice(&[
            ("AWS_ACCESS_KEY_ID", "AKIDEXAMPLE"),
            ("DEV_CREDENTIALS_IAM_ROLE_ARN", "arn:aws:iam::123:role/dev"),
        ]);
        assert_eq!(detect_source(&env, true), CredentialSource::Environment);
    }

    #[test]
    fn dev_helper_requires_debug_build() {
        let env = Env::from_slice(&[("DEV_CREDENTIALS_IAM_ROLE_ARN", "arn:aws:iam::123:role/dev")]);
        assert_eq!(detect_source(&env, true), CredentialSource::DevProcess);
        assert_eq!(detect_source(&env, false), CredentialSource::None);
    }

    #[test]
    fn empty_environment_has_no_source() {
        let env = Env::from_slice(&[]);
        assert_eq!(detect_source(&env, true), CredentialSource::None);
    }
}
