//! The key-verification hook in front of every mutating route.
//!
//! kpr does not issue or store keys. The host supplies one async check,
//! `client -> bool`, and hands the same [`KeyVerifier`] to the ownership and
//! publishing routes. One verifier per deployment is a convention the host
//! keeps by building it once and cloning it; the routes refuse to build
//! without one.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::client::Client;
use crate::handler::BoxFuture;

type VerifyFn = Arc<dyn Fn(Client) -> BoxFuture<'static, bool> + Send + Sync>;

/// Decides whether a caller may add owners, publish, or unpublish.
///
/// Cloning is cheap and every clone calls the same check.
///
/// ```rust
/// use kpr::KeyVerifier;
///
/// let verifier = KeyVerifier::new(|client| async move {
///     client.key.as_deref() == Some("s3cret")
/// });
/// ```
#[derive(Clone)]
pub struct KeyVerifier {
    check: VerifyFn,
}

impl KeyVerifier {
    pub fn new<F, Fut>(check: F) -> Self
    where
        F: Fn(Client) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let check: VerifyFn = Arc::new(move |client: Client| -> BoxFuture<'static, bool> {
            Box::pin(check(client))
        });
        Self { check }
    }

    /// Runs the check once. There is no timeout: a check that never
    /// finishes holds the request until the transport gives up.
    pub async fn verify(&self, client: &Client) -> bool {
        let verified = (self.check)(client.clone()).await;
        if verified {
            debug!(agent = %client.agent_id, "key verified");
        } else {
            warn!(agent = %client.agent_id, has_key = client.key.is_some(), "key verification refused");
        }
        verified
    }
}

impl std::fmt::Debug for KeyVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyVerifier").finish_non_exhaustive()
    }
}
