//! The registry routes.
//!
//! | Route | Middleware | Paths |
//! |---|---|---|
//! | List, Exists, Fetch | [`Packages`] | `GET /p`, `HEAD`/`GET /p/{id}[/{version}]` |
//! | Owner list, add, remove | [`Owners`] | `GET`/`POST`/`DELETE /o/{id}` |
//! | Publish, unpublish | [`Publishing`] | `PUT`/`DELETE /p/{id}[/{version}]` |
//! | Config | [`Config`] | `GET /kpm-config.json` |
//!
//! Every route is built through a builder whose `build()` fails when a
//! required handler is missing, so a misconfigured route never serves.

mod config;
mod owner;
mod packages;
mod publishing;

pub use config::{Config, RegistryConfig};
pub use owner::{Owners, OwnersBuilder};
pub use packages::{Packages, PackagesBuilder};
pub use publishing::{Publishing, PublishingBuilder};

use crate::middleware::Outcome;
use crate::response::Response;
use crate::status::Status;

/// Package index.
pub const LIST_PATH: &str = "/p";
/// Prefix of every package path, `/p/{id}[/{version}]`.
pub const PACKAGES_PATH: &str = "/p/";
/// Prefix of every ownership path, `/o/{id}`.
pub const OWNER_PATH: &str = "/o/";
/// The registry's self-description.
pub const CONFIG_PATH: &str = "/kpm-config.json";

fn answer(status: Status) -> Outcome {
    Outcome::Respond(Response::status(status))
}

fn answer_if(ok: bool, yes: Status, no: Status) -> Outcome {
    answer(if ok { yes } else { no })
}
