//! `GET /kpm-config.json`: what this registry serves.
//!
//! Clients read this once to learn where packages live and whether the
//! publishing and ownership routes are mounted.

use http::Method;
use serde::{Deserialize, Serialize};

use super::{CONFIG_PATH, LIST_PATH};
use crate::handler::BoxFuture;
use crate::middleware::{Middleware, Outcome};
use crate::package::matches_exact;
use crate::request::Request;
use crate::response::Response;

/// The document served at [`CONFIG_PATH`].
///
/// | Field | Default |
/// |---|---|
/// | `packages` | `"/p"` |
/// | `publishing` | `false` |
/// | `owner` | `false` |
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub packages: String,
    pub publishing: bool,
    pub owner: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self { packages: LIST_PATH.to_owned(), publishing: false, owner: false }
    }
}

/// Serves a [`RegistryConfig`] fixed at construction.
#[derive(Clone, Debug, Default)]
pub struct Config {
    config: RegistryConfig,
}

impl Config {
    pub fn new(config: RegistryConfig) -> Self {
        Self { config }
    }
}

impl Middleware for Config {
    fn handle(&self, req: Request) -> BoxFuture<'_, Outcome> {
        let outcome = if matches_exact(req.path(), CONFIG_PATH) && req.method() == Method::GET {
            Outcome::Respond(Response::json(&self.config))
        } else {
            Outcome::Next(req)
        };
        Box::pin(std::future::ready(outcome))
    }
}
