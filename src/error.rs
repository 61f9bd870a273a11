/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Errors produced while retrieving or rotating credentials.

use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

/// An error retrieving or rotating credentials.
///
/// Causes are held behind [`Arc`] so the error is `Clone`: every caller joined
/// to a single in-flight refresh receives the same failure.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum CredentialsError {
    /// The credential source produced no usable credentials.
    ///
    /// Raised when a payload fails validation (a `"null"` placeholder field,
    /// an expiration already in the past, a decode error) or when no credential
    /// source is configured at all.
    MissingCredentials {
        /// Why the credentials were rejected or absent.
        reason: Arc<dyn Error + Send + Sync>,
    },

    /// An STS `AssumeRole` call failed or returned no credentials.
    RoleAssumptionFailed {
        /// The role that could not be assumed.
        role_arn: String,
        /// The underlying STS or transport failure.
        cause: Arc<dyn Error + Send + Sync>,
    },

    /// A lower-level I/O failure from the container endpoint or subprocess.
    RetrieverTransport {
        /// The underlying transport failure.
        cause: Arc<dyn Error + Send + Sync>,
    },

    /// The provider has been shut down; no further credentials will be served.
    ProviderShutDown,

    /// A refresh in progress was cancelled by shutdown.
    Cancelled,
}

impl CredentialsError {
    /// Creates a [`CredentialsError::MissingCredentials`].
    pub fn missing_credentials(reason: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        CredentialsError::MissingCredentials {
            reason: reason.into().into(),
        }
    }

    /// Creates a [`CredentialsError::RoleAssumptionFailed`].
    pub fn role_assumption_failed(
        role_arn: impl Into<String>,
        cause: impl Into<Box<dyn Error + Send + Sync>>,
    ) -> Self {
        CredentialsError::RoleAssumptionFailed {
            role_arn: role_arn.into(),
            cause: cause.into().into(),
        }
    }

    /// Creates a [`CredentialsError::RetrieverTransport`].
    pub fn retriever_transport(cause: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        CredentialsError::RetrieverTransport {
            cause: cause.into().into(),
        }
    }
}

impl Display for CredentialsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CredentialsError::MissingCredentials { reason } => {
                write!(f, "no credentials are available: {}", reason)
            }
            CredentialsError::RoleAssumptionFailed { role_arn, cause } => {
                write!(f, "failed to assume role {}: {}", role_arn, cause)
            }
            CredentialsError::RetrieverTransport { cause } => {
                write!(f, "failed to contact the credential source: {}", cause)
            }
            CredentialsError::ProviderShutDown => {
                write!(f, "the credentials provider has been shut down")
            }
            CredentialsError::Cancelled => {
                write!(f, "the credential refresh was cancelled")
            }
        }
    }
}

impl Error for CredentialsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CredentialsError::MissingCredentials { reason } => Some(reason.as_ref() as _),
            CredentialsError::RoleAssumptionFailed { cause, .. } => Some(cause.as_ref() as _),
            CredentialsError::RetrieverTransport { cause } => Some(cause.as_ref() as _),
            CredentialsError::ProviderShutDown | CredentialsError::Cancelled => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::CredentialsError;
    use std::error::Error;

    #[test]
    fn source_is_preserved() {
        let err = CredentialsError::retriever_transport("connection reset");
        assert!(err.source().is_some());
        assert!(CredentialsError::ProviderShutDown.source().is_none());
    }

    #[test]
    fn errors_are_cloneable() {
        let err = CredentialsError::role_assumption_failed("arn:aws:iam::123:role/x", "denied");
        let cloned = err.clone();
        assert_eq!(format!("{}", err), format!("{}", cloned));
    }
}
