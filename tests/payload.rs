/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Black-box tests of the credential payload codec.

use aws_rotating_credentials::json_credentials::{
    format_credentials_payload, parse_credentials_payload, InvalidCredentialsPayload,
};
use aws_rotating_credentials::ExpiringCredentials;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn now() -> SystemTime {
    // 2009-02-13T23:31:30Z
    UNIX_EPOCH + Duration::from_secs(1_234_567_890)
}

#[test]
fn null_access_key_id_means_missing_credentials() {
    let err = parse_credentials_payload(
        br#"{"AccessKeyId":"null","SecretAccessKey":"s","Token":"t"}"#,
        now(),
    )
    .expect_err("null access key id");
    assert!(matches!(
        err,
        InvalidCredentialsPayload::NullCredentials("AccessKeyId")
    ));
}

#[test]
fn null_token_means_missing_credentials() {
    let err = parse_credentials_payload(
        br#"{"AccessKeyId":"a","SecretAccessKey":"s","Token":"null"}"#,
        now(),
    )
    .expect_err("null token");
    assert!(matches!(
        err,
        InvalidCredentialsPayload::NullCredentials("Token")
    ));
}

#[test]
fn past_expiration_means_missing_credentials() {
    let err = parse_credentials_payload(
        br#"{"AccessKeyId":"a","SecretAccessKey":"s","Token":"t","Expiration":"1918-03-12T20:29:09Z"}"#,
        now(),
    )
    .expect_err("expiration in the past");
    assert!(matches!(
        err,
        InvalidCredentialsPayload::CredentialsExpired { .. }
    ));
}

#[test]
fn missing_required_field_is_reported() {
    let err = parse_credentials_payload(br#"{"AccessKeyId":"a"}"#, now())
        .expect_err("no secret access key");
    assert!(matches!(
        err,
        InvalidCredentialsPayload::MissingField("SecretAccessKey")
    ));
}

#[test]
fn token_key_is_used() {
    let creds = parse_credentials_payload(
        br#"{"AccessKeyId":"a","SecretAccessKey":"s","Token":"xyz"}"#,
        now(),
    )
    .expect("valid payload");
    assert_eq!(creds.session_token(), Some("xyz"));
}

#[test]
fn session_token_key_is_used_iff_token_is_absent() {
    let creds = parse_credentials_payload(
        br#"{"AccessKeyId":"a","SecretAccessKey":"s","SessionToken":"xyz"}"#,
        now(),
    )
    .expect("valid payload");
    assert_eq!(creds.session_token(), Some("xyz"));
}

#[test]
fn expiration_is_parsed_as_utc() {
    let creds = parse_credentials_payload(
        br#"{"AccessKeyId":"a","SecretAccessKey":"s","Expiration":"2009-02-13T23:31:31Z"}"#,
        now(),
    )
    .expect("one second in the future");
    assert_eq!(creds.expiration(), Some(now() + Duration::from_secs(1)));
}

#[test]
fn round_trips_through_the_payload_format() {
    let original = ExpiringCredentials::new(
        "AKIDEXAMPLE",
        "SECRET",
        Some("TOKEN".to_string()),
        Some(now() + Duration::from_secs(900)),
    );
    let payload = format_credentials_payload(&original);
    let decoded = parse_credentials_payload(payload.as_bytes(), now()).expect("valid payload");
    assert_eq!(original, decoded);

    let no_extras = ExpiringCredentials::from_keys("AKIDEXAMPLE", "SECRET", None);
    let payload = format_credentials_payload(&no_extras);
    let decoded = parse_credentials_payload(payload.as_bytes(), now()).expect("valid payload");
    assert_eq!(no_extras, decoded);
}
