//! Locating the package archive in a publish request.
//!
//! Multipart parsing belongs to whatever sits in front of the publishing
//! route. The resolver only has to turn "the `package` field of this
//! request" into a byte stream, or say why it cannot.

use std::future::{self, Future};
use std::sync::Arc;

use futures_util::{StreamExt, stream};
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::handler::BoxFuture;
use crate::request::Request;
use crate::response::ByteStream;

/// The form field a publish request carries its archive under.
pub const UPLOAD_FIELD: &str = "package";

/// What a resolver found.
pub enum Upload {
    /// The archive, ready to be read by the publish handler.
    Stream(ByteStream),
    /// The request carries no archive: answered with `400`.
    Missing,
    /// Something is there but cannot be read as a stream. This is a
    /// deployment fault, so it goes to the chain's error handler.
    Unreadable(String),
}

type ResolveFn = Arc<dyn Fn(&Request, &str) -> BoxFuture<'static, Upload> + Send + Sync>;

/// Resolves the upload for a publish request.
///
/// The closure runs synchronously against the borrowed request and returns
/// a future that owns whatever it needs.
#[derive(Clone)]
pub struct UploadResolver {
    resolve: ResolveFn,
}

impl UploadResolver {
    pub fn new<F, Fut>(resolve: F) -> Self
    where
        F: Fn(&Request, &str) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Upload> + Send + 'static,
    {
        let resolve: ResolveFn = Arc::new(move |req: &Request, field: &str| -> BoxFuture<'static, Upload> {
            Box::pin(resolve(req, field))
        });
        Self { resolve }
    }

    pub async fn resolve(&self, req: &Request, field: &str) -> Upload {
        (self.resolve)(req, field).await
    }
}

/// Streams, in order of preference:
///
/// 1. a file staged under `field` by an upstream middleware
///    ([`Request::stage_file`]),
/// 2. the raw request body, when it is not empty.
///
/// With neither, the upload is [`Upload::Unreadable`].
impl Default for UploadResolver {
    fn default() -> Self {
        Self { resolve: Arc::new(resolve_default) }
    }
}

fn resolve_default(req: &Request, field: &str) -> BoxFuture<'static, Upload> {
    if let Some(path) = req.staged_file(field) {
        let path = path.to_owned();
        return Box::pin(async move {
            match tokio::fs::File::open(&path).await {
                Ok(file) => {
                    debug!(path = %path.display(), "streaming staged upload");
                    Upload::Stream(ReaderStream::new(file).boxed())
                }
                Err(e) => Upload::Unreadable(format!("{}: {e}", path.display())),
            }
        });
    }

    if !req.body().is_empty() {
        let body = req.body().clone();
        return Box::pin(future::ready(Upload::Stream(stream::once(future::ready(Ok(body))).boxed())));
    }

    Box::pin(future::ready(Upload::Unreadable(format!("no `{field}` upload on the request"))))
}

impl std::fmt::Debug for UploadResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadResolver").finish_non_exhaustive()
    }
}
