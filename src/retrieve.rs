/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! The pluggable source of fresh credentials.
//!
//! ## Implementing your own credential retriever
//!
//! If you are loading credentials dynamically, provide your own implementation
//! of [`RetrieveCredentials`]. Generally, this is best done by defining an
//! inherent `async fn` on your structure, then calling that method directly
//! from the trait implementation.
//! ```rust
//! use aws_rotating_credentials::retrieve::{self, future, RetrieveCredentials};
//! use aws_rotating_credentials::ExpiringCredentials;
//!
//! #[derive(Debug)]
//! struct VaultCredentialRetriever;
//!
//! impl VaultCredentialRetriever {
//!     async fn load_credentials(&self) -> retrieve::Result {
//!         // Async process to retrieve credentials goes here
//!         Ok(ExpiringCredentials::from_keys("akid", "secret", None))
//!     }
//! }
//!
//! impl RetrieveCredentials for VaultCredentialRetriever {
//!     fn retrieve_credentials<'a>(&'a self) -> future::RetrieveCredentials<'a>
//!     where
//!         Self: 'a,
//!     {
//!         future::RetrieveCredentials::new(self.load_credentials())
//!     }
//! }
//! ```

use crate::credentials::ExpiringCredentials;
use crate::error::CredentialsError;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// Result type for credential retrieval.
pub type Result = std::result::Result<ExpiringCredentials, CredentialsError>;

/// Futures returned by [`RetrieveCredentials`] implementations.
pub mod future {
    use std::future::Future;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

    /// Either an immediately-ready value or a boxed future producing one.
    enum NowOrLater<'a, T> {
        Now(Option<T>),
        Later(BoxFuture<'a, T>),
    }

    impl<T: Unpin> Future for NowOrLater<'_, T> {
        type Output = T;

        fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
            match self.get_mut() {
                NowOrLater::Now(value) => {
                    Poll::Ready(value.take().expect("polled after completion"))
                }
                NowOrLater::Later(future) => future.as_mut().poll(cx),
            }
        }
    }

    /// Future returned by [`RetrieveCredentials::retrieve_credentials`](super::RetrieveCredentials::retrieve_credentials).
    pub struct RetrieveCredentials<'a>(NowOrLater<'a, super::Result>);

    impl<'a> RetrieveCredentials<'a> {
        /// Creates a `RetrieveCredentials` future from another future.
        pub fn new(future: impl Future<Output = super::Result> + Send + 'a) -> Self {
            RetrieveCredentials(NowOrLater::Later(Box::pin(future)))
        }

        /// Creates a `RetrieveCredentials` future that is immediately ready.
        pub fn ready(result: super::Result) -> Self {
            RetrieveCredentials(NowOrLater::Now(Some(result)))
        }
    }

    impl Future for RetrieveCredentials<'_> {
        type Output = super::Result;

        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
            Pin::new(&mut self.0).poll(cx)
        }
    }

    /// Future returned by [`RetrieveCredentials::shutdown`](super::RetrieveCredentials::shutdown).
    pub struct Shutdown<'a>(NowOrLater<'a, std::result::Result<(), super::CredentialsError>>);

    impl<'a> Shutdown<'a> {
        /// Creates a `Shutdown` future from another future.
        pub fn new(
            future: impl Future<Output = std::result::Result<(), super::CredentialsError>> + Send + 'a,
        ) -> Self {
            Shutdown(NowOrLater::Later(Box::pin(future)))
        }

        /// Creates a `Shutdown` future that is immediately ready.
        pub fn ready(result: std::result::Result<(), super::CredentialsError>) -> Self {
            Shutdown(NowOrLater::Now(Some(result)))
        }
    }

    impl Future for Shutdown<'_> {
        type Output = std::result::Result<(), super::CredentialsError>;

        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
            Pin::new(&mut self.0).poll(cx)
        }
    }
}

/// Asynchronous credential retriever.
///
/// Implementations fetch a fresh set of [`ExpiringCredentials`] on every call;
/// caching and rotation are the concern of
/// [`RotatingCredentialsProvider`](crate::rotating::RotatingCredentialsProvider),
/// not of retrievers. A retriever is responsible for its own deadlines; the
/// rotating provider imposes no timeout on retrieval.
pub trait RetrieveCredentials: Send + Sync {
    /// Retrieves a fresh set of credentials. May suspend; may fail.
    fn retrieve_credentials<'a>(&'a self) -> future::RetrieveCredentials<'a>
    where
        Self: 'a;

    /// Releases resources held by the retriever (connection pools, subprocess
    /// handles). Idempotent. The rotating provider calls this exactly once,
    /// during its own shutdown.
    fn shutdown<'a>(&'a self) -> future::Shutdown<'a>
    where
        Self: 'a,
    {
        future::Shutdown::ready(Ok(()))
    }
}

impl RetrieveCredentials for ExpiringCredentials {
    fn retrieve_credentials<'a>(&'a self) -> future::RetrieveCredentials<'a>
    where
        Self: 'a,
    {
        future::RetrieveCredentials::ready(Ok(self.clone()))
    }
}

impl RetrieveCredentials for Arc<dyn RetrieveCredentials> {
    fn retrieve_credentials<'a>(&'a self) -> future::RetrieveCredentials<'a>
    where
        Self: 'a,
    {
        self.as_ref().retrieve_credentials()
    }

    fn shutdown<'a>(&'a self) -> future::Shutdown<'a>
    where
        Self: 'a,
    {
        self.as_ref().shutdown()
    }
}

/// Wrapper type for a shareable [`RetrieveCredentials`].
#[derive(Clone)]
pub struct SharedCredentialsRetriever(Arc<dyn RetrieveCredentials>);

impl SharedCredentialsRetriever {
    /// Creates a new `SharedCredentialsRetriever` from a [`RetrieveCredentials`].
    pub fn new(retriever: impl RetrieveCredentials + 'static) -> Self {
        SharedCredentialsRetriever(Arc::new(retriever))
    }
}

impl RetrieveCredentials for SharedCredentialsRetriever {
    fn retrieve_credentials<'a>(&'a self) -> future::RetrieveCredentials<'a>
    where
        Self: 'a,
    {
        self.0.retrieve_credentials()
    }

    fn shutdown<'a>(&'a self) -> future::Shutdown<'a>
    where
        Self: 'a,
    {
        self.0.shutdown()
    }
}

/// A [`RetrieveCredentials`] implemented by a closure.
///
/// See [`retrieve_credentials_fn`] for more details.
#[derive(Copy, Clone)]
pub struct RetrieveCredentialsFn<'c, T, F>
where
    T: Fn() -> F + Send + Sync + 'c,
    F: Future<Output = Result> + Send + 'static,
{
    f: T,
    phantom: PhantomData<&'c T>,
}

impl<'c, T, F> RetrieveCredentials for RetrieveCredentialsFn<'c, T, F>
where
    T: Fn() -> F + Send + Sync + 'c,
    F: Future<Output = Result> + Send + 'static,
{
    fn retrieve_credentials<'a>(&'a self) -> future::RetrieveCredentials<'a>
    where
        Self: 'a,
    {
        future::RetrieveCredentials::new((self.f)())
    }
}

/// Returns a new [`RetrieveCredentialsFn`] with the given closure. This allows
/// you to create a [`RetrieveCredentials`] implementation from an async block
/// that returns a [`Result`].
///
/// # Example
///
/// ```rust
/// use aws_rotating_credentials::retrieve::retrieve_credentials_fn;
/// use aws_rotating_credentials::ExpiringCredentials;
///
/// async fn load_credentials() -> ExpiringCredentials {
///     todo!()
/// }
///
/// retrieve_credentials_fn(|| async {
///     // Async process to retrieve credentials goes here
///     let credentials = load_credentials().await;
///     Ok(credentials)
/// });
/// ```
pub fn retrieve_credentials_fn<'c, T, F>(f: T) -> RetrieveCredentialsFn<'c, T, F>
where
    T: Fn() -> F + Send + Sync + 'c,
    F: Future<Output = Result> + Send + 'static,
{
    RetrieveCredentialsFn {
        f,
        phantom: Default::default(),
    }
}

#[cfg(test)]
mod test {
    use super::{retrieve_credentials_fn, RetrieveCredentials, SharedCredentialsRetriever};
    use crate::credentials::ExpiringCredentials;

    #[tokio::test]
    async fn static_credentials_retrieve_themselves() {
        let creds = ExpiringCredentials::from_keys("akid", "secret", None);
        let retrieved = creds.retrieve_credentials().await.expect("static creds");
        assert_eq!(creds, retrieved);
    }

    #[tokio::test]
    async fn closure_retriever() {
        let retriever = SharedCredentialsRetriever::new(retrieve_credentials_fn(|| async {
            Ok(ExpiringCredentials::from_keys("akid", "secret", None))
        }));
        let creds = retriever.retrieve_credentials().await.expect("closure creds");
        assert_eq!(creds.access_key_id(), "akid");
        retriever.shutdown().await.expect("default shutdown is ok");
    }
}
