/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Codec for the JSON credential payload served by the container metadata
//! endpoint and printed by subprocess credential helpers.
//!
//! Recognized keys (case-sensitive): `AccessKeyId`, `SecretAccessKey`,
//! `Expiration` (ISO-8601), `Token`, and `SessionToken` (used iff `Token` is
//! absent). The literal string `"null"` in a credential field means "no
//! credentials available" and fails decoding.

use crate::credentials::ExpiringCredentials;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::time::SystemTime;

#[derive(Debug, Default, Deserialize, Serialize)]
struct CredentialsDocument {
    #[serde(rename = "AccessKeyId", skip_serializing_if = "Option::is_none")]
    access_key_id: Option<String>,
    #[serde(rename = "SecretAccessKey", skip_serializing_if = "Option::is_none")]
    secret_access_key: Option<String>,
    #[serde(rename = "Token", skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(rename = "SessionToken", skip_serializing_if = "Option::is_none")]
    session_token: Option<String>,
    #[serde(rename = "Expiration", skip_serializing_if = "Option::is_none")]
    expiration: Option<String>,
}

/// A credential payload failed validation.
#[derive(Debug)]
#[non_exhaustive]
pub enum InvalidCredentialsPayload {
    /// A required field was missing from the payload.
    MissingField(&'static str),

    /// A credential field held the literal string `"null"`.
    ///
    /// Credential helpers use this placeholder to report that no credentials
    /// are currently available.
    NullCredentials(&'static str),

    /// The payload carried an expiration that is not in the future.
    CredentialsExpired {
        /// The expiration as it appeared in the payload.
        expiration: String,
    },

    /// A field was present but unusable.
    InvalidField {
        /// Which field was invalid.
        field: &'static str,
        /// Why the field was rejected.
        err: Box<dyn Error + Send + Sync>,
    },

    /// The payload was not valid JSON.
    InvalidJson(serde_json::Error),
}

impl Display for InvalidCredentialsPayload {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            InvalidCredentialsPayload::MissingField(field) => {
                write!(f, "missing required field `{}`", field)
            }
            InvalidCredentialsPayload::NullCredentials(field) => {
                write!(f, "`{}` was the literal string \"null\"", field)
            }
            InvalidCredentialsPayload::CredentialsExpired { expiration } => {
                write!(f, "credentials are already expired (expiration: {})", expiration)
            }
            InvalidCredentialsPayload::InvalidField { field, err } => {
                write!(f, "invalid `{}`: {}", field, err)
            }
            InvalidCredentialsPayload::InvalidJson(err) => {
                write!(f, "invalid credentials payload: {}", err)
            }
        }
    }
}

impl Error for InvalidCredentialsPayload {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            InvalidCredentialsPayload::InvalidField { err, .. } => Some(err.as_ref() as _),
            InvalidCredentialsPayload::InvalidJson(err) => Some(err as _),
            _ => None,
        }
    }
}

fn required_field(
    value: Option<String>,
    field: &'static str,
) -> Result<String, InvalidCredentialsPayload> {
    match value {
        None => Err(InvalidCredentialsPayload::MissingField(field)),
        Some(value) => checked_field(value, field),
    }
}

fn checked_field(value: String, field: &'static str) -> Result<String, InvalidCredentialsPayload> {
    if value == "null" {
        Err(InvalidCredentialsPayload::NullCredentials(field))
    } else if value.is_empty() {
        Err(InvalidCredentialsPayload::InvalidField {
            field,
            err: "field must not be empty".into(),
        })
    } else {
        Ok(value)
    }
}

/// Decodes a credential payload, validating it against the current time `now`.
///
/// The session token is taken from `Token` when present and from
/// `SessionToken` otherwise. Decoding fails if a credential field holds the
/// literal string `"null"` or if `Expiration` is present and not strictly in
/// the future.
pub fn parse_credentials_payload(
    payload: &[u8],
    now: SystemTime,
) -> Result<ExpiringCredentials, InvalidCredentialsPayload> {
    let document: CredentialsDocument =
        serde_json::from_slice(payload).map_err(InvalidCredentialsPayload::InvalidJson)?;

    let access_key_id = required_field(document.access_key_id, "AccessKeyId")?;
    let secret_access_key = required_field(document.secret_access_key, "SecretAccessKey")?;
    let session_token = match (document.token, document.session_token) {
        (Some(token), _) => Some(checked_field(token, "Token")?),
        (None, Some(token)) => Some(checked_field(token, "SessionToken")?),
        (None, None) => None,
    };
    let expiration = match document.expiration {
        Some(raw) => {
            let parsed = DateTime::parse_from_rfc3339(&raw).map_err(|err| {
                InvalidCredentialsPayload::InvalidField {
                    field: "Expiration",
                    err: err.into(),
                }
            })?;
            let expiration = SystemTime::from(parsed);
            if expiration <= now {
                return Err(InvalidCredentialsPayload::CredentialsExpired { expiration: raw });
            }
            Some(expiration)
        }
        None => None,
    };

    Ok(ExpiringCredentials::new(
        access_key_id,
        secret_access_key,
        session_token,
        expiration,
    ))
}

/// Encodes credentials as a payload that [`parse_credentials_payload`] accepts.
///
/// The session token is always written under the preferred `Token` key.
pub fn format_credentials_payload(credentials: &ExpiringCredentials) -> String {
    let document = CredentialsDocument {
        access_key_id: Some(credentials.access_key_id().to_string()),
        secret_access_key: Some(credentials.secret_access_key().to_string()),
        token: credentials.session_token().map(str::to_string),
        session_token: None,
        expiration: credentials
            .expiration()
            .map(|expiration| {
                DateTime::<Utc>::from(expiration).to_rfc3339_opts(SecondsFormat::Secs, true)
            }),
    };
    serde_json::to_string(&document).expect("document serializes to JSON")
}
