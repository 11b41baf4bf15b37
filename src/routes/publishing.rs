//! Write side of the registry: `PUT` and `DELETE /p/{id}[/{version}]`.

use std::future::Future;

use http::Method;
use tracing::{debug, error};

use super::{PACKAGES_PATH, answer, answer_if};
use crate::client::Client;
use crate::error::{Error, Result};
use crate::handler::{self, BoxFuture, PackageFn, PublishFn};
use crate::middleware::{Middleware, Outcome};
use crate::package::{PackageRef, matches_prefix};
use crate::request::Request;
use crate::response::ByteStream;
use crate::status::Status;
use crate::upload::{UPLOAD_FIELD, Upload, UploadResolver};
use crate::verifier::KeyVerifier;

/// Publish and unpublish.
///
/// Both go through the [`KeyVerifier`] first. Unpublishing is optional: a
/// deployment without an `unpublish` handler answers `405` once the caller
/// is verified.
pub struct Publishing {
    publish: PublishFn,
    unpublish: Option<PackageFn>,
    uploads: UploadResolver,
    verifier: KeyVerifier,
}

impl Publishing {
    pub fn builder() -> PublishingBuilder {
        PublishingBuilder::default()
    }

    async fn dispatch(&self, req: Request) -> Outcome {
        let method = req.method().clone();
        if !matches_prefix(req.path(), PACKAGES_PATH) || !matches!(method, Method::PUT | Method::DELETE) {
            return Outcome::Next(req);
        }

        let pkg = PackageRef::from_path(req.path(), PACKAGES_PATH.len(), true);
        if pkg.id.is_none() {
            return answer(Status::NotFound);
        }

        let client = Client::from_request(&req);
        if !self.verifier.verify(&client).await {
            return answer(Status::Forbidden);
        }

        if method == Method::PUT {
            self.publish(req, pkg, client).await
        } else {
            self.unpublish(pkg, client).await
        }
    }

    async fn publish(&self, req: Request, pkg: PackageRef, client: Client) -> Outcome {
        let upload: ByteStream = match self.uploads.resolve(&req, UPLOAD_FIELD).await {
            Upload::Stream(stream) => stream,
            Upload::Missing => return answer(Status::BadRequest),
            Upload::Unreadable(reason) => {
                error!(package = %pkg, %reason, "upload resolver produced no stream");
                return Outcome::Fail(Error::UnreadableUpload { package: pkg.to_string() });
            }
        };

        debug!(package = %pkg, "publish");
        let published = (self.publish)(pkg, client, upload).await;
        answer_if(published, Status::Created, Status::BadRequest)
    }

    async fn unpublish(&self, pkg: PackageRef, client: Client) -> Outcome {
        let Some(unpublish) = &self.unpublish else {
            return answer(Status::MethodNotAllowed);
        };

        debug!(package = %pkg, "unpublish");
        let removed = unpublish(pkg, client).await;
        answer_if(removed, Status::Ok, Status::BadRequest)
    }
}

impl Middleware for Publishing {
    fn handle(&self, req: Request) -> BoxFuture<'_, Outcome> {
        Box::pin(self.dispatch(req))
    }
}

/// Builder for [`Publishing`]. `publish` and a verifier are required;
/// `unpublish` and the upload resolver are not.
#[derive(Default)]
pub struct PublishingBuilder {
    publish: Option<PublishFn>,
    unpublish: Option<PackageFn>,
    uploads: Option<UploadResolver>,
    verifier: Option<KeyVerifier>,
}

impl PublishingBuilder {
    /// `publish(pkg, client, upload)`: `true` is `201`, `false` is `400`.
    pub fn publish<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(PackageRef, Client, ByteStream) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        self.publish = Some(handler::publish_fn(f));
        self
    }

    /// `unpublish(pkg, client)`: `true` is `200`, `false` is `400`.
    pub fn unpublish<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(PackageRef, Client) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        self.unpublish = Some(handler::package_fn(f));
        self
    }

    /// Replaces [`UploadResolver::default`].
    pub fn upload_resolver(mut self, resolver: UploadResolver) -> Self {
        self.uploads = Some(resolver);
        self
    }

    pub fn verifier(mut self, verifier: KeyVerifier) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub fn build(self) -> Result<Publishing> {
        Ok(Publishing {
            publish: self.publish.ok_or(Error::MissingHandler("publish"))?,
            unpublish: self.unpublish,
            uploads: self.uploads.unwrap_or_default(),
            verifier: self.verifier.ok_or(Error::MissingVerifier)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use bytes::{Bytes, BytesMut};
    use futures_util::TryStreamExt;

    use super::*;

    fn accepting(verified: bool) -> KeyVerifier {
        KeyVerifier::new(move |_| async move { verified })
    }

    fn builder() -> PublishingBuilder {
        Publishing::builder()
            .publish(|_, _, _| async { true })
            .unpublish(|_, _| async { true })
            .verifier(accepting(true))
    }

    fn request(method: Method, path: &str) -> Request {
        Request::new(method, path)
            .with_header("x-kpm-key", "123")
            .with_body("archive")
    }

    async fn status(route: &Publishing, req: Request) -> u16 {
        match route.handle(req).await {
            Outcome::Respond(res) => res.code(),
            other => panic!("expected a response, got {other:?}"),
        }
    }

    #[test]
    fn requires_publish_and_verifier_only() {
        assert!(matches!(
            Publishing::builder().verifier(accepting(true)).build(),
            Err(Error::MissingHandler("publish")),
        ));
        assert!(matches!(
            Publishing::builder().publish(|_, _, _| async { true }).build(),
            Err(Error::MissingVerifier),
        ));
        assert!(Publishing::builder().publish(|_, _, _| async { true }).verifier(accepting(true)).build().is_ok());
    }

    #[tokio::test]
    async fn passes_through_other_paths_and_methods() {
        let route = builder().build().unwrap();
        assert!(matches!(route.handle(request(Method::PUT, "/foo/")).await, Outcome::Next(_)));
        for method in [Method::GET, Method::HEAD, Method::POST] {
            assert!(matches!(route.handle(request(method, "/p/foo")).await, Outcome::Next(_)));
        }
    }

    #[tokio::test]
    async fn missing_id_is_404_before_verification() {
        let verified = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&verified);
        let route = builder()
            .verifier(KeyVerifier::new(move |_| {
                flag.store(true, Ordering::SeqCst);
                async { true }
            }))
            .build()
            .unwrap();

        assert_eq!(status(&route, request(Method::PUT, "/p/")).await, 404);
        assert_eq!(status(&route, request(Method::DELETE, "/p/")).await, 404);
        assert!(!verified.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn unverified_is_403() {
        let route = builder().verifier(accepting(false)).build().unwrap();
        assert_eq!(status(&route, request(Method::PUT, "/p/foo")).await, 403);
        assert_eq!(status(&route, request(Method::DELETE, "/p/foo")).await, 403);
    }

    #[tokio::test]
    async fn unverified_never_resolves_or_mutates() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (on_publish, on_unpublish, on_resolve) = (Arc::clone(&calls), Arc::clone(&calls), Arc::clone(&calls));
        let route = Publishing::builder()
            .publish(move |_, _, _| {
                on_publish.fetch_add(1, Ordering::SeqCst);
                async { true }
            })
            .unpublish(move |_, _| {
                on_unpublish.fetch_add(1, Ordering::SeqCst);
                async { true }
            })
            .upload_resolver(UploadResolver::new(move |_, _| {
                on_resolve.fetch_add(1, Ordering::SeqCst);
                async { Upload::Missing }
            }))
            .verifier(accepting(false))
            .build()
            .unwrap();

        assert_eq!(status(&route, request(Method::PUT, "/p/foo")).await, 403);
        assert_eq!(status(&route, request(Method::DELETE, "/p/foo")).await, 403);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn publish_maps_result() {
        let route = builder().build().unwrap();
        assert_eq!(status(&route, request(Method::PUT, "/p/foo/1.0.0")).await, 201);

        let refusing = builder().publish(|_, _, _| async { false }).build().unwrap();
        assert_eq!(status(&refusing, request(Method::PUT, "/p/foo/1.0.0")).await, 400);
    }

    #[tokio::test]
    async fn publish_receives_the_upload() {
        let seen = Arc::new(Mutex::new(None));
        let record = Arc::clone(&seen);
        let route = builder()
            .publish(move |pkg, _, upload| {
                let record = Arc::clone(&record);
                async move {
                    let body: BytesMut = upload
                        .try_fold(BytesMut::new(), |mut buf, chunk| async move {
                            buf.extend_from_slice(&chunk);
                            Ok(buf)
                        })
                        .await
                        .unwrap();
                    *record.lock().unwrap() = Some((pkg, body.freeze()));
                    true
                }
            })
            .build()
            .unwrap();

        assert_eq!(status(&route, request(Method::PUT, "/p/foo/1.0.0")).await, 201);
        assert_eq!(
            *seen.lock().unwrap(),
            Some((PackageRef::new("foo", "1.0.0"), Bytes::from_static(b"archive"))),
        );
    }

    #[tokio::test]
    async fn unreadable_upload_fails_without_publishing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        let route = builder()
            .publish(move |_, _, _| {
                counted.fetch_add(1, Ordering::SeqCst);
                async { true }
            })
            .upload_resolver(UploadResolver::new(|_, _| async { Upload::Unreadable("not a stream".into()) }))
            .build()
            .unwrap();

        match route.handle(request(Method::PUT, "/p/foo/1.0.0")).await {
            Outcome::Fail(Error::UnreadableUpload { package }) => assert_eq!(package, "foo@1.0.0"),
            other => panic!("expected a failure, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_upload_is_400() {
        let route = builder()
            .upload_resolver(UploadResolver::new(|_, _| async { Upload::Missing }))
            .build()
            .unwrap();
        assert_eq!(status(&route, request(Method::PUT, "/p/foo")).await, 400);
    }

    #[tokio::test]
    async fn default_resolver_without_upload_fails() {
        let route = builder().build().unwrap();
        let req = Request::new(Method::PUT, "/p/foo").with_header("x-kpm-key", "123");
        assert!(matches!(route.handle(req).await, Outcome::Fail(Error::UnreadableUpload { .. })));
    }

    #[tokio::test]
    async fn unpublish_maps_result() {
        let route = builder().build().unwrap();
        assert_eq!(status(&route, request(Method::DELETE, "/p/foo")).await, 200);

        let refusing = builder().unpublish(|_, _| async { false }).build().unwrap();
        assert_eq!(status(&refusing, request(Method::DELETE, "/p/foo")).await, 400);
    }

    #[tokio::test]
    async fn unpublish_without_handler_is_405_after_verification() {
        let verified = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&verified);
        let route = Publishing::builder()
            .publish(|_, _, _| async { true })
            .verifier(KeyVerifier::new(move |_| {
                flag.store(true, Ordering::SeqCst);
                async { true }
            }))
            .build()
            .unwrap();

        assert_eq!(status(&route, request(Method::DELETE, "/p/foo")).await, 405);
        assert!(verified.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn unpublish_without_handler_still_refuses_unverified() {
        let route = Publishing::builder()
            .publish(|_, _, _| async { true })
            .verifier(accepting(false))
            .build()
            .unwrap();
        assert_eq!(status(&route, request(Method::DELETE, "/p/foo")).await, 403);
    }
}
