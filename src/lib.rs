/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

#![deny(missing_docs)]

//! Rotating provider of short-lived AWS IAM credentials.
//!
//! Long-lived processes need AWS credentials that outlive any single session
//! token. This crate keeps a set of [`ExpiringCredentials`] fresh by pulling
//! replacements from a pluggable [`RetrieveCredentials`] source (the ECS
//! container metadata endpoint, STS `AssumeRole`, environment variables, or a
//! dev helper process) shortly before the held credentials expire, without
//! ever blocking callers that still hold valid credentials.
//!
//! # Example
//!
//! ```rust,no_run
//! use aws_rotating_credentials::retrieve::retrieve_credentials_fn;
//! use aws_rotating_credentials::{CredentialsError, ExpiringCredentials, RotatingCredentialsProvider};
//!
//! # async fn example() -> Result<(), CredentialsError> {
//! let provider = RotatingCredentialsProvider::builder()
//!     .retriever(retrieve_credentials_fn(|| async {
//!         // An async process to retrieve credentials would go here:
//!         Ok(ExpiringCredentials::from_keys("akid", "secret", None))
//!     }))
//!     .build()
//!     .await?;
//! provider.start();
//!
//! let credentials = provider.credentials().await?;
//! # let _ = credentials;
//!
//! provider.shutdown().await?;
//! provider.wait().await;
//! # Ok(())
//! # }
//! ```
//!
//! Use [`default_retriever::default_retriever`] to pick the credential source
//! from the process environment the way the service bootstrap does.

pub mod credentials;
pub mod default_retriever;
pub mod ecs;
pub mod environment;
pub mod error;
pub mod json_credentials;
pub mod os;
pub mod process;
pub mod retrieve;
pub mod retriever_config;
pub mod rotating;
pub mod sleep;
pub mod sts;
pub mod time;

#[cfg(test)]
pub(crate) mod test_util;

pub use credentials::ExpiringCredentials;
pub use error::CredentialsError;
pub use retrieve::{RetrieveCredentials, SharedCredentialsRetriever};
pub use rotating::{ProviderStatus, RotatingCredentialsProvider};
