//! Middleware layer.
//!
//! Every registry route is a middleware: it looks at a request and either
//! answers it, hands it on untouched, or fails. The [`Chain`](crate::Chain)
//! runs them in registration order.
//!
//! ```text
//! request ─▶ health ─Next─▶ packages ─Next─▶ owner ─Next─▶ publishing ─Next─▶ 404
//!               │              │               │               │
//!            Respond        Respond/Fail    Respond/Fail    Respond/Fail
//! ```
//!
//! A middleware never answers and passes on the same request: `Next` gives
//! the request back by value, so there is nothing left to answer with.

use std::future::Future;

use crate::error::Error;
use crate::handler::BoxFuture;
use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// What a middleware decided to do with a request.
#[derive(Debug)]
pub enum Outcome {
    /// Answer the request; the rest of the chain is skipped.
    Respond(Response),
    /// Not this middleware's path or method: try the next one.
    Next(Request),
    /// Something the host must decide how to present.
    Fail(Error),
}

impl Outcome {
    pub fn respond(res: impl IntoResponse) -> Self {
        Self::Respond(res.into_response())
    }
}

/// A link in the chain.
///
/// Routes implement this directly. For a one-off closure use [`from_fn`].
pub trait Middleware: Send + Sync + 'static {
    fn handle(&self, req: Request) -> BoxFuture<'_, Outcome>;
}

/// Wraps an `async` closure as a [`Middleware`].
///
/// ```rust
/// use kpr::{Chain, Outcome, middleware};
///
/// let chain = Chain::new().with(middleware::from_fn(|req: kpr::Request| async move {
///     if req.path() == "/ping" { Outcome::respond("pong") } else { Outcome::Next(req) }
/// }));
/// ```
pub fn from_fn<F, Fut>(f: F) -> FromFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    FromFn(f)
}

/// See [`from_fn`].
pub struct FromFn<F>(F);

impl<F, Fut> Middleware for FromFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    fn handle(&self, req: Request) -> BoxFuture<'_, Outcome> {
        Box::pin((self.0)(req))
    }
}
