/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Abstraction for reading environment variables, so source discovery can be
//! tested without mutating the process environment.

use std::collections::HashMap;
use std::env::VarError;
use std::sync::Arc;

/// Environment variable abstraction.
///
/// Environment variables are global to a process, and, as such, are difficult
/// to test with a multi-threaded test runner like Rust's. This enables loading
/// environment variables either from the actual process environment
/// ([`std::env::var`]) or from a hash map.
#[derive(Clone, Debug)]
pub struct Env(Arc<Inner>);

#[derive(Debug)]
enum Inner {
    Real,
    Fake(HashMap<String, String>),
}

impl Default for Env {
    fn default() -> Self {
        Self::real()
    }
}

impl Env {
    /// Retrieves an environment variable.
    pub fn get(&self, k: &str) -> Result<String, VarError> {
        match self.0.as_ref() {
            Inner::Real => std::env::var(k),
            Inner::Fake(map) => map.get(k).cloned().ok_or(VarError::NotPresent),
        }
    }

    /// Creates a fake process environment from a slice of tuples.
    ///
    /// # Example
    /// ```rust
    /// use aws_rotating_credentials::os::Env;
    /// let mock_env = Env::from_slice(&[("AWS_ACCESS_KEY_ID", "AKIDEXAMPLE")]);
    /// assert_eq!(mock_env.get("AWS_ACCESS_KEY_ID").unwrap(), "AKIDEXAMPLE");
    /// ```
    pub fn from_slice<'a>(vars: &[(&'a str, &'a str)]) -> Self {
        Self(Arc::new(Inner::Fake(
            vars.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )))
    }

    /// Creates a process environment that delegates to [`std::env::var`].
    pub fn real() -> Self {
        Self(Arc::new(Inner::Real))
    }
}

impl From<HashMap<String, String>> for Env {
    fn from(hash_map: HashMap<String, String>) -> Self {
        Self(Arc::new(Inner::Fake(hash_map)))
    }
}
