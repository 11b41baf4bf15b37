//! Turning a fetch handler's answer into a response.
//!
//! A fetch handler may answer in four ways, and each has exactly one HTTP
//! meaning:
//!
//! | Result | Response |
//! |---|---|
//! | [`FetchResult::Empty`] | `404 Not Found` |
//! | [`FetchResult::Bytes`] | `200 OK`, the bytes as body |
//! | [`FetchResult::Stream`] | `200 OK`, the stream piped into the body |
//! | [`FetchResult::Redirect`] | `302 Found` to the given location |
//!
//! The match is total. The one way left to break the contract is a redirect
//! target that cannot be sent as a `location` header; that is handed to the
//! chain as [`Error::UnsupportedResult`] rather than answered.

use bytes::Bytes;
use http::HeaderValue;

use crate::error::Error;
use crate::middleware::Outcome;
use crate::package::PackageRef;
use crate::response::{ByteStream, Response};
use crate::status::Status;

/// What a fetch handler found for a package.
pub enum FetchResult {
    /// Nothing under that id and version.
    Empty,
    /// The whole archive in memory.
    Bytes(Bytes),
    /// The archive as a byte stream, e.g. straight from disk.
    Stream(ByteStream),
    /// The archive lives elsewhere (a CDN, object storage).
    Redirect(String),
}

impl FetchResult {
    /// Builds the response for this result, or the error to pass down the
    /// chain. `pkg` names the package in that error.
    pub fn respond(self, pkg: &PackageRef) -> Outcome {
        match self {
            Self::Empty => Outcome::Respond(Response::status(Status::NotFound)),
            Self::Bytes(bytes) => Outcome::Respond(Response::bytes(bytes)),
            Self::Stream(stream) => Outcome::Respond(Response::stream(stream)),
            Self::Redirect(location) if HeaderValue::from_str(&location).is_ok() => {
                Outcome::Respond(Response::redirect(&location))
            }
            Self::Redirect(_) => Outcome::Fail(Error::UnsupportedResult { package: pkg.to_string() }),
        }
    }
}

impl std::fmt::Debug for FetchResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            Self::Stream(_) => f.write_str("Stream"),
            Self::Redirect(location) => f.debug_tuple("Redirect").field(location).finish(),
        }
    }
}

impl From<Bytes> for FetchResult {
    fn from(bytes: Bytes) -> Self { Self::Bytes(bytes) }
}

impl From<Vec<u8>> for FetchResult {
    fn from(bytes: Vec<u8>) -> Self { Self::Bytes(bytes.into()) }
}

impl From<ByteStream> for FetchResult {
    fn from(stream: ByteStream) -> Self { Self::Stream(stream) }
}

/// A string result is a redirect target.
impl From<String> for FetchResult {
    fn from(location: String) -> Self { Self::Redirect(location) }
}

impl From<&str> for FetchResult {
    fn from(location: &str) -> Self { Self::Redirect(location.to_owned()) }
}

/// `None` is "not found", whatever the `Some` side would have been.
impl<T: Into<FetchResult>> From<Option<T>> for FetchResult {
    fn from(result: Option<T>) -> Self {
        result.map_or(Self::Empty, Into::into)
    }
}
