//! Kubernetes health probes as a middleware.
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? Failure → restart. |
//! | **Readiness** | `/readyz` | Can the pod serve traffic? Failure → pulled from load-balancer. |
//!
//! Mount it first so probes never reach the registry handlers:
//!
//! ```rust,no_run
//! use kpr::{Chain, health};
//!
//! let app = Chain::new().with(health::probes());
//! ```

use http::Method;

use crate::handler::BoxFuture;
use crate::middleware::{Middleware, Outcome};
use crate::request::Request;
use crate::response::Response;

pub const LIVENESS_PATH: &str = "/healthz";
pub const READINESS_PATH: &str = "/readyz";

/// Answers `GET /healthz` with `"ok"` and `GET /readyz` with `"ready"`.
///
/// If the process can respond to HTTP at all, it is alive and ready: the
/// registry's storage lives behind the host's handlers, not here.
pub struct Probes;

pub fn probes() -> Probes {
    Probes
}

impl Middleware for Probes {
    fn handle(&self, req: Request) -> BoxFuture<'_, Outcome> {
        let body = match req.path() {
            LIVENESS_PATH => Some("ok"),
            READINESS_PATH => Some("ready"),
            _ => None,
        };
        let outcome = match body {
            Some(body) if req.method() == Method::GET => Outcome::Respond(Response::text(body)),
            _ => Outcome::Next(req),
        };
        Box::pin(std::future::ready(outcome))
    }
}
