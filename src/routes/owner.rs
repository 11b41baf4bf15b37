//! Package ownership: `GET`, `POST` and `DELETE /o/{id}`.
//!
//! Listing owners is open. Adding and removing one needs a `user` in the
//! request body and a caller the [`KeyVerifier`] accepts, checked in that
//! order, before the handler runs.

use std::future::Future;

use http::Method;
use serde::Deserialize;
use tracing::debug;

use super::{OWNER_PATH, answer, answer_if};
use crate::client::Client;
use crate::error::{Error, Result};
use crate::handler::{self, BoxFuture, OwnerChangeFn, OwnersFn};
use crate::middleware::{Middleware, Outcome};
use crate::package::{PackageRef, matches_prefix};
use crate::request::Request;
use crate::response::Response;
use crate::status::Status;
use crate::verifier::KeyVerifier;

/// Ownership routes. Versions in the path are ignored: `/o/foo/1.0.0`
/// addresses `foo`.
pub struct Owners {
    list: OwnersFn,
    add: OwnerChangeFn,
    remove: OwnerChangeFn,
    verifier: KeyVerifier,
}

#[derive(Deserialize)]
struct OwnerBody {
    user: Option<String>,
}

impl Owners {
    pub fn builder() -> OwnersBuilder {
        OwnersBuilder::default()
    }

    async fn dispatch(&self, req: Request) -> Outcome {
        if !matches_prefix(req.path(), OWNER_PATH) {
            return Outcome::Next(req);
        }

        let pkg = PackageRef::from_path(req.path(), OWNER_PATH.len(), false);
        if pkg.id.is_none() {
            return answer(Status::NotFound);
        }

        let client = Client::from_request(&req);
        let method = req.method().clone();
        let change = match method {
            Method::GET => {
                let owners = (self.list)(pkg, client).await.unwrap_or_default();
                return Outcome::Respond(Response::json(&owners));
            }
            Method::POST => &self.add,
            Method::DELETE => &self.remove,
            _ => return Outcome::Next(req),
        };

        let Some(user) = body_user(&req) else {
            return answer(Status::BadRequest);
        };
        if !self.verifier.verify(&client).await {
            return answer(Status::Forbidden);
        }

        debug!(package = %pkg, %user, %method, "owner change");
        let changed = change(pkg, client, user).await;
        answer_if(changed, Status::NoContent, Status::NotFound)
    }
}

/// The non-empty `user` of a JSON or form-encoded body.
fn body_user(req: &Request) -> Option<String> {
    let form = req.header("content-type")
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

    let user = if form {
        url::form_urlencoded::parse(req.body())
            .find(|(k, _)| k == "user")
            .map(|(_, v)| v.into_owned())
    } else {
        serde_json::from_slice::<OwnerBody>(req.body()).ok()?.user
    };
    user.filter(|u| !u.is_empty())
}

impl Middleware for Owners {
    fn handle(&self, req: Request) -> BoxFuture<'_, Outcome> {
        Box::pin(self.dispatch(req))
    }
}

/// Builder for [`Owners`]. All three handlers and a verifier are required.
#[derive(Default)]
pub struct OwnersBuilder {
    list: Option<OwnersFn>,
    add: Option<OwnerChangeFn>,
    remove: Option<OwnerChangeFn>,
    verifier: Option<KeyVerifier>,
}

impl OwnersBuilder {
    /// `list(pkg, client)`. `None` is answered with an empty array.
    pub fn list<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(PackageRef, Client) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<Vec<String>>> + Send + 'static,
    {
        self.list = Some(handler::owners_fn(f));
        self
    }

    /// `add(pkg, client, user)`: `true` is `204`, `false` is `404`.
    pub fn add<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(PackageRef, Client, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        self.add = Some(handler::owner_change_fn(f));
        self
    }

    /// `remove(pkg, client, user)`: `true` is `204`, `false` is `404`.
    pub fn remove<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(PackageRef, Client, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        self.remove = Some(handler::owner_change_fn(f));
        self
    }

    pub fn verifier(mut self, verifier: KeyVerifier) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub fn build(self) -> Result<Owners> {
        Ok(Owners {
            add: self.add.ok_or(Error::MissingHandler("add"))?,
            list: self.list.ok_or(Error::MissingHandler("list"))?,
            remove: self.remove.ok_or(Error::MissingHandler("remove"))?,
            verifier: self.verifier.ok_or(Error::MissingVerifier)?,
        })
    }
}
