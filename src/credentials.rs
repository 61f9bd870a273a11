/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Short-lived AWS credentials.

use std::fmt;
use std::time::SystemTime;

/// AWS credentials that may expire.
///
/// An immutable value type holding an access key id, a secret access key, an
/// optional session token, and an optional expiration instant. A value with no
/// expiration never goes stale; a value with an expiration communicates to the
/// rotating provider when a replacement must be fetched.
///
/// Credentials are superseded, never mutated: every refresh produces a new
/// value.
#[derive(Clone, PartialEq, Eq)]
pub struct ExpiringCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
    expiration: Option<SystemTime>,
}

impl ExpiringCredentials {
    /// Creates credentials from their four parts.
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
        expiration: Option<SystemTime>,
    ) -> Self {
        ExpiringCredentials {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token,
            expiration,
        }
    }

    /// Creates credentials that never expire.
    pub fn from_keys(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self::new(access_key_id, secret_access_key, session_token, None)
    }

    /// Returns the access key id.
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// Returns the secret access key.
    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    /// Returns the session token, if any.
    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    /// Returns the instant at which these credentials expire, if any.
    pub fn expiration(&self) -> Option<SystemTime> {
        self.expiration
    }

    /// True if an expiration is set and is at or before `instant`.
    pub(crate) fn expires_by(&self, instant: SystemTime) -> bool {
        matches!(self.expiration, Some(expiration) if expiration <= instant)
    }
}

impl fmt::Debug for ExpiringCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Security: the secret and the session token must never appear in logs
        f.debug_struct("ExpiringCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "** redacted **"),
            )
            .field("expiration", &self.expiration)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::ExpiringCredentials;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn debug_redacts_secrets() {
        let creds = ExpiringCredentials::new(
            "AKIDEXAMPLE",
            "super-secret",
            Some("session-token".to_string()),
            None,
        );
        let debugged = format!("{:?}", creds);
        assert!(debugged.contains("AKIDEXAMPLE"));
        assert!(!debugged.contains("super-secret"));
        assert!(!debugged.contains("session-token"));
    }

    #[test]
    fn expires_by() {
        let expiration = UNIX_EPOCH + Duration::from_secs(100);
        let creds = ExpiringCredentials::new("a", "s", None, Some(expiration));
        assert!(creds.expires_by(expiration));
        assert!(creds.expires_by(expiration + Duration::from_secs(1)));
        assert!(!creds.expires_by(expiration - Duration::from_secs(1)));

        let no_expiry = ExpiringCredentials::from_keys("a", "s", None);
        assert!(!no_expiry.expires_by(expiration));
    }
}
