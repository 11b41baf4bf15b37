//! # kpr
//!
//! HTTP middleware for kpm package registries. kpr owns the routing and the
//! HTTP semantics; the host owns storage and keys.
//!
//! ## The contract
//!
//! The host supplies async handlers: list the index, look a package up,
//! fetch it, change its owners, publish it. kpr parses the path, reads the
//! `x-kpm-*` caller headers, asks the [`KeyVerifier`] before anything that
//! mutates, calls the handler, and turns the answer into a response.
//!
//! What kpr intentionally leaves to the host:
//!
//! - **Storage** — handlers decide where packages and owners live
//! - **Keys** — issuing them; kpr only asks the verifier yes or no
//! - **Multipart parsing** — staged uploads arrive via [`Request::stage_file`]
//! - **Timeouts** — a handler that never answers holds its request
//!
//! ## Routes
//!
//! | Route | Method | Path | Answers |
//! |---|---|---|---|
//! | List | GET | `/p` | 200 + array (`?page=&size=`) |
//! | Exists | HEAD | `/p/{id}[/{version}]` | 200 / 404 |
//! | Fetch | GET | `/p/{id}[/{version}]` | 200 bytes or stream, 302, 404 |
//! | Owner list | GET | `/o/{id}` | 200 + array, 404 |
//! | Owner add / remove | POST / DELETE | `/o/{id}`, `{"user"}` | 204, 400, 403, 404 |
//! | Publish | PUT | `/p/{id}[/{version}]` | 201, 400, 403, 404 |
//! | Unpublish | DELETE | `/p/{id}[/{version}]` | 200, 400, 403, 404, 405 |
//! | Config | GET | `/kpm-config.json` | 200 + `{packages, publishing, owner}` |
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use bytes::Bytes;
//! use kpr::{Chain, Config, KeyVerifier, Owners, Packages, Publishing, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), kpr::Error> {
//!     let verifier = KeyVerifier::new(|client| async move { client.key.is_some() });
//!
//!     let app = Chain::new()
//!         .with(Config::default())
//!         .with(Packages::builder()
//!             .list(|_page, _size| async { None })
//!             .exists(|_pkg, _client| async { false })
//!             .fetch(|_pkg, _client| async { None::<Bytes> })
//!             .build()?)
//!         .with(Owners::builder()
//!             .list(|_pkg, _client| async { None })
//!             .add(|_pkg, _client, _user| async { true })
//!             .remove(|_pkg, _client, _user| async { true })
//!             .verifier(verifier.clone())
//!             .build()?)
//!         .with(Publishing::builder()
//!             .publish(|_pkg, _client, _upload| async { true })
//!             .verifier(verifier)
//!             .build()?);
//!
//!     Server::bind(([0, 0, 0, 0], 3000).into()).serve(app).await
//! }
//! ```

mod chain;
mod client;
mod error;
mod fetch;
mod handler;
mod package;
mod request;
mod response;
mod server;
mod settings;
mod status;
mod upload;
mod verifier;

pub mod health;
pub mod middleware;
pub mod routes;

pub use chain::Chain;
pub use client::Client;
pub use error::{Error, Result};
pub use fetch::FetchResult;
pub use handler::BoxFuture;
pub use middleware::{Middleware, Outcome};
pub use package::{PackageRef, matches_exact, matches_prefix};
pub use request::Request;
pub use response::{ByteStream, ContentType, IntoResponse, Response, ResponseBuilder};
pub use routes::{Config, Owners, Packages, Publishing, RegistryConfig};
pub use server::Server;
pub use settings::Settings;
pub use status::Status;
pub use upload::{UPLOAD_FIELD, Upload, UploadResolver};
pub use verifier::KeyVerifier;
