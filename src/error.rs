//! Unified error type.

/// The error type returned by kpr's fallible operations.
///
/// Client mistakes (missing id, missing `user`, unverified key) are expressed
/// as HTTP [`Response`](crate::Response) values, not as `Error`s. This type
/// covers the other three kinds of failure:
///
/// - route construction with a handler or verifier missing,
/// - a handler or upload resolver producing something a response cannot be
///   built from (handed to the chain as [`Outcome::Fail`](crate::Outcome)),
/// - infrastructure: binding a port, opening an upload, reading settings.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0} handler must be provided")]
    MissingHandler(&'static str),

    #[error("no key verifier was provided")]
    MissingVerifier,

    #[error("kpr: unsupported result given for fetch: {package}")]
    UnsupportedResult { package: String },

    #[error("kpr: non-readable stream returned from the upload resolver: {package}")]
    UnreadableUpload { package: String },

    #[error("invalid setting: {0}")]
    Settings(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
