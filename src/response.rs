//! Outgoing HTTP response type and the [`IntoResponse`] conversion trait.
//!
//! Routes depend only on the constructors here: a bare status, a byte body,
//! a JSON body, a redirect, or a piped stream. Turning that into a hyper
//! response is the server's job.

use std::io;

use bytes::{Bytes, BytesMut};
use futures_util::stream::BoxStream;
use futures_util::TryStreamExt;
use http::header::{HeaderName, HeaderValue};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full, StreamBody};
use hyper::body::Frame;
use serde::Serialize;
use tracing::warn;

use crate::status::Status;

/// A readable byte stream: fetch results, uploads, streamed bodies.
pub type ByteStream = BoxStream<'static, io::Result<Bytes>>;

/// The body type handed to hyper.
pub(crate) type HyperBody = UnsyncBoxBody<Bytes, io::Error>;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Content-type values the registry emits.
pub enum ContentType {
    Json,        // application/json
    OctetStream, // application/octet-stream  (package archives)
    Text,        // text/plain; charset=utf-8
}

impl ContentType {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Json        => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Text        => "text/plain; charset=utf-8",
        }
    }
}

// ── Body ──────────────────────────────────────────────────────────────────────

pub(crate) enum Body {
    Empty,
    Full(Bytes),
    Stream(ByteStream),
}

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// # Shortcuts (200 OK, no custom headers needed)
///
/// ```rust
/// use kpr::{Response, Status};
///
/// Response::json(&["left-pad", "is-odd"]);
/// Response::text("hello");
/// Response::status(Status::NoContent);
/// Response::redirect("https://cdn.example.com/left-pad-1.0.0.tgz");
/// ```
pub struct Response {
    pub(crate) body: Body,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) status: u16,
}

impl Response {
    /// `200 OK` — `application/json`, serialised with serde_json.
    ///
    /// Serialisation failure answers `500` instead; the types the routes
    /// hand in (`Vec<Value>`, `Vec<String>`, config structs) cannot fail.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self::full(ContentType::Json.as_str(), body.into()),
            Err(e) => {
                warn!("json serialisation failed: {e}");
                Self::status(Status::InternalServerError)
            }
        }
    }

    /// `200 OK` — `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::full(ContentType::Text.as_str(), Bytes::from(body.into()))
    }

    /// `200 OK` — `application/octet-stream`.
    pub fn bytes(body: impl Into<Bytes>) -> Self {
        Self::full(ContentType::OctetStream.as_str(), body.into())
    }

    /// `200 OK` — the stream is piped into the connection as it is polled.
    pub fn stream(stream: ByteStream) -> Self {
        Self {
            body: Body::Stream(stream),
            headers: vec![("content-type".to_owned(), ContentType::OctetStream.as_str().to_owned())],
            status: Status::Ok.into(),
        }
    }

    /// `302 Found` with a `location` header.
    pub fn redirect(location: &str) -> Self {
        Self::builder()
            .status(Status::Found)
            .header("location", location)
            .no_body()
    }

    /// Response with no body.
    pub fn status(code: Status) -> Self {
        Self { body: Body::Empty, headers: Vec::new(), status: code.into() }
    }

    /// Builder for responses that need a custom status or extra headers.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { headers: Vec::new(), status: Status::Ok.into() }
    }

    fn full(content_type: &str, body: Bytes) -> Self {
        Self {
            body: Body::Full(body),
            headers: vec![("content-type".to_owned(), content_type.to_owned())],
            status: Status::Ok.into(),
        }
    }

    pub fn code(&self) -> u16 { self.status }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self.body, Body::Stream(_))
    }

    /// Drains the body into memory, polling a streamed body to the end.
    pub async fn into_bytes(self) -> io::Result<Bytes> {
        match self.body {
            Body::Empty => Ok(Bytes::new()),
            Body::Full(bytes) => Ok(bytes),
            Body::Stream(stream) => {
                let buf = stream
                    .try_fold(BytesMut::new(), |mut buf, chunk| async move {
                        buf.extend_from_slice(&chunk);
                        Ok(buf)
                    })
                    .await?;
                Ok(buf.freeze())
            }
        }
    }

    pub(crate) fn into_inner(self) -> http::Response<HyperBody> {
        let body: HyperBody = match self.body {
            Body::Empty => Empty::<Bytes>::new().map_err(|never| match never {}).boxed_unsync(),
            Body::Full(bytes) => Full::new(bytes).map_err(|never| match never {}).boxed_unsync(),
            Body::Stream(stream) => StreamBody::new(stream.map_ok(Frame::data)).boxed_unsync(),
        };

        let mut res = http::Response::new(body);
        *res.status_mut() = http::StatusCode::from_u16(self.status)
            .unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR);
        for (name, value) in self.headers {
            match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(&value)) {
                (Ok(name), Ok(value)) => { res.headers_mut().append(name, value); }
                _ => warn!(header = %name, "dropping invalid response header"),
            }
        }
        res
    }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("streaming", &self.is_streaming())
            .finish()
    }
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`].
///
/// Obtain via [`Response::builder()`]. Defaults to `Status::Ok` (200).
/// Terminated by a typed body method — you always know what you're sending.
pub struct ResponseBuilder {
    headers: Vec<(String, String)>,
    status: u16,
}

impl ResponseBuilder {
    pub fn status(mut self, code: Status) -> Self {
        self.status = code.into();
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    /// Terminate with a plain-text body (`text/plain; charset=utf-8`).
    pub fn text(self, body: impl Into<String>) -> Response {
        self.finish(ContentType::Text, Bytes::from(body.into()))
    }

    /// Terminate with a typed body.
    pub fn bytes(self, content_type: ContentType, body: impl Into<Bytes>) -> Response {
        self.finish(content_type, body.into())
    }

    /// Terminate with no body (e.g. `Status::NoContent`, `Status::Found`).
    pub fn no_body(self) -> Response {
        Response { body: Body::Empty, headers: self.headers, status: self.status }
    }

    fn finish(self, content_type: ContentType, body: Bytes) -> Response {
        let mut headers = vec![("content-type".to_owned(), content_type.as_str().to_owned())];
        headers.extend(self.headers);
        Response { body: Body::Full(body), headers, status: self.status }
    }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into an HTTP [`Response`].
///
/// Lets closures mounted on the chain return a `Status` or a string directly
/// through [`Outcome::respond`](crate::Outcome::respond).
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for String {
    fn into_response(self) -> Response { Response::text(self) }
}

/// Return a [`Status`] directly: `Outcome::respond(Status::NotFound)`
impl IntoResponse for Status {
    fn into_response(self) -> Response { Response::status(self) }
}
