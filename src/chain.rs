//! Ordered middleware chain.
//!
//! Middleware run in the order they were added. The first one to answer
//! wins; a request nobody answers gets `404`; a failure goes to the error
//! handler, which decides how the host presents it.

use std::sync::Arc;

use tracing::{debug, error};

use crate::error::Error;
use crate::middleware::{Middleware, Outcome};
use crate::request::Request;
use crate::response::Response;
use crate::status::Status;

type ErrorHandler = Arc<dyn Fn(&Error) -> Response + Send + Sync>;

/// The application: registry routes plus whatever else the host mounts.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve).
/// Each [`Chain::with`] call returns `self` so registrations chain naturally.
pub struct Chain {
    stack: Vec<Box<dyn Middleware>>,
    on_error: ErrorHandler,
}

impl Chain {
    pub fn new() -> Self {
        Self { stack: Vec::new(), on_error: Arc::new(default_error_response) }
    }

    /// Append a middleware. Returns `self` for chaining.
    ///
    /// ```rust,no_run
    /// # use kpr::{Chain, Config, Packages};
    /// # fn routes(packages: Packages) -> Chain {
    /// Chain::new()
    ///     .with(Config::default())
    ///     .with(packages)
    /// # }
    /// ```
    pub fn with(mut self, middleware: impl Middleware) -> Self {
        self.stack.push(Box::new(middleware));
        self
    }

    /// Replace the response built for [`Outcome::Fail`].
    ///
    /// The default logs the error and answers `500` with its message.
    pub fn on_error(mut self, handler: impl Fn(&Error) -> Response + Send + Sync + 'static) -> Self {
        self.on_error = Arc::new(handler);
        self
    }

    /// Runs `req` down the chain and produces exactly one response.
    pub async fn handle(&self, mut req: Request) -> Response {
        for middleware in &self.stack {
            match middleware.handle(req).await {
                Outcome::Respond(res) => return res,
                Outcome::Next(passed) => req = passed,
                Outcome::Fail(err) => return (self.on_error)(&err),
            }
        }

        debug!(method = %req.method(), path = req.path(), "no middleware answered");
        Response::status(Status::NotFound)
    }
}

impl Default for Chain {
    fn default() -> Self { Self::new() }
}

fn default_error_response(err: &Error) -> Response {
    error!("request failed: {err}");
    Response::builder()
        .status(Status::InternalServerError)
        .text(err.to_string())
}
