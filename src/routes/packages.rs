//! Read side of the registry: list, exists, fetch.

use std::future::Future;

use http::Method;
use serde_json::Value;
use tracing::debug;

use super::{LIST_PATH, PACKAGES_PATH, answer, answer_if};
use crate::client::Client;
use crate::error::{Error, Result};
use crate::fetch::FetchResult;
use crate::handler::{self, BoxFuture, FetchFn, ListFn, PackageFn};
use crate::middleware::{Middleware, Outcome};
use crate::package::{PackageRef, matches_exact, matches_prefix};
use crate::request::Request;
use crate::response::Response;
use crate::status::Status;

const DEFAULT_PAGE: i64 = 0;
const DEFAULT_SIZE: i64 = -1;

/// `GET /p`, `HEAD /p/{id}[/{version}]` and `GET /p/{id}[/{version}]`.
///
/// ```rust
/// use bytes::Bytes;
/// use kpr::Packages;
///
/// let packages = Packages::builder()
///     .list(|_page, _size| async { Some(vec![serde_json::json!("left-pad")]) })
///     .exists(|pkg, _client| async move { pkg.id() == Some("left-pad") })
///     .fetch(|_pkg, _client| async { None::<Bytes> })
///     .build()
///     .unwrap();
/// ```
pub struct Packages {
    list: ListFn,
    exists: PackageFn,
    fetch: FetchFn,
}

impl Packages {
    pub fn builder() -> PackagesBuilder {
        PackagesBuilder::default()
    }

    async fn dispatch(&self, req: Request) -> Outcome {
        let method = req.method().clone();
        if matches_exact(req.path(), LIST_PATH) {
            return match method {
                Method::GET => self.list(&req).await,
                _ => Outcome::Next(req),
            };
        }

        if !matches_prefix(req.path(), PACKAGES_PATH) || !matches!(method, Method::HEAD | Method::GET) {
            return Outcome::Next(req);
        }

        let pkg = PackageRef::from_path(req.path(), PACKAGES_PATH.len(), true);
        if pkg.id.is_none() {
            return answer(Status::NotFound);
        }

        let client = Client::from_request(&req);
        if method == Method::HEAD {
            let exists = (self.exists)(pkg, client).await;
            answer_if(exists, Status::Ok, Status::NotFound)
        } else {
            debug!(package = %pkg, "fetch");
            let result: FetchResult = (self.fetch)(pkg.clone(), client).await;
            result.respond(&pkg)
        }
    }

    async fn list(&self, req: &Request) -> Outcome {
        let page = query_number(req, "page", DEFAULT_PAGE);
        let size = query_number(req, "size", DEFAULT_SIZE);
        let list = (self.list)(page, size).await.unwrap_or_default();
        Outcome::Respond(Response::json(&list))
    }
}

/// Absent and unparseable values both fall back to `default`.
fn query_number(req: &Request, name: &str, default: i64) -> i64 {
    match req.query(name) {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            debug!(param = name, value = %raw, "ignoring non-numeric query parameter");
            default
        }),
    }
}

impl Middleware for Packages {
    fn handle(&self, req: Request) -> BoxFuture<'_, Outcome> {
        Box::pin(self.dispatch(req))
    }
}

/// Builder for [`Packages`]. All three handlers are required.
#[derive(Default)]
pub struct PackagesBuilder {
    list: Option<ListFn>,
    exists: Option<PackageFn>,
    fetch: Option<FetchFn>,
}

impl PackagesBuilder {
    /// `list(page, size)`. `page` defaults to 0, `size` to -1 (everything).
    /// `None` is answered with an empty array.
    pub fn list<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(i64, i64) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<Vec<Value>>> + Send + 'static,
    {
        self.list = Some(handler::list_fn(f));
        self
    }

    /// `exists(pkg, client)`, answered `200` or `404`.
    pub fn exists<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(PackageRef, Client) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        self.exists = Some(handler::package_fn(f));
        self
    }

    /// `fetch(pkg, client)`, answered per [`FetchResult`].
    pub fn fetch<F, Fut, R>(mut self, f: F) -> Self
    where
        F: Fn(PackageRef, Client) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Into<FetchResult>,
    {
        self.fetch = Some(handler::fetch_fn(f));
        self
    }

    pub fn build(self) -> Result<Packages> {
        Ok(Packages {
            fetch: self.fetch.ok_or(Error::MissingHandler("fetch"))?,
            list: self.list.ok_or(Error::MissingHandler("list"))?,
            exists: self.exists.ok_or(Error::MissingHandler("exists"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use bytes::Bytes;
    use futures_util::{StreamExt, stream};
    use serde_json::json;

    use super::*;
    use crate::response::ByteStream;

    fn builder() -> PackagesBuilder {
        Packages::builder()
            .list(|_, _| async { None })
            .exists(|_, _| async { false })
            .fetch(|_, _| async { FetchResult::Empty })
    }

    fn fetching<R>(result: impl Fn() -> R + Send + Sync + 'static) -> Packages
    where
        R: Into<FetchResult> + Send + 'static,
    {
        builder()
            .fetch(move |_, _| {
                let r = result();
                async move { r }
            })
            .build()
            .unwrap()
    }

    async fn respond(route: &Packages, req: Request) -> Response {
        match route.handle(req).await {
            Outcome::Respond(res) => res,
            other => panic!("expected a response, got {other:?}"),
        }
    }

    fn get(path: &str) -> Request {
        Request::new(Method::GET, path)
    }

    #[test]
    fn requires_every_handler() {
        let missing = |b: PackagesBuilder| b.build().err().map(|e| e.to_string());
        assert_eq!(
            missing(Packages::builder().exists(|_, _| async { true }).fetch(|_, _| async { FetchResult::Empty })),
            Some("list handler must be provided".into()),
        );
        assert_eq!(
            missing(Packages::builder().list(|_, _| async { None }).fetch(|_, _| async { FetchResult::Empty })),
            Some("exists handler must be provided".into()),
        );
        assert_eq!(
            missing(Packages::builder().list(|_, _| async { None }).exists(|_, _| async { true })),
            Some("fetch handler must be provided".into()),
        );
        assert!(builder().build().is_ok());
    }

    #[tokio::test]
    async fn passes_through_unrecognised_paths() {
        let route = builder().build().unwrap();
        assert!(matches!(route.handle(get("/foo/")).await, Outcome::Next(req) if req.path() == "/foo/"));
        assert!(matches!(route.handle(get("/pkg/foo")).await, Outcome::Next(_)));
    }

    #[tokio::test]
    async fn list_defaults_page_and_size() {
        let seen = Arc::new(Mutex::new(None));
        let record = Arc::clone(&seen);
        let route = builder()
            .list(move |page, size| {
                *record.lock().unwrap() = Some((page, size));
                async { None }
            })
            .build()
            .unwrap();

        respond(&route, get("/p")).await;
        assert_eq!(*seen.lock().unwrap(), Some((0, -1)));
    }

    #[tokio::test]
    async fn list_passes_explicit_page_and_size() {
        let seen = Arc::new(Mutex::new(None));
        let record = Arc::clone(&seen);
        let route = builder()
            .list(move |page, size| {
                *record.lock().unwrap() = Some((page, size));
                async { None }
            })
            .build()
            .unwrap();

        respond(&route, get("/p?page=1&size=4")).await;
        assert_eq!(*seen.lock().unwrap(), Some((1, 4)));

        respond(&route, get("/p?page=two")).await;
        assert_eq!(*seen.lock().unwrap(), Some((0, -1)));
    }

    #[tokio::test]
    async fn list_answers_empty_array_for_none() {
        let route = builder().build().unwrap();
        let res = respond(&route, get("/p")).await;
        assert_eq!(res.code(), 200);
        assert_eq!(res.into_bytes().await.unwrap(), "[]");
    }

    #[tokio::test]
    async fn list_answers_the_list() {
        let route = builder()
            .list(|_, _| async { Some(vec![json!({"id": "foo"}), json!({"id": "bar"})]) })
            .build()
            .unwrap();
        let res = respond(&route, get("/p")).await;
        assert_eq!(res.into_bytes().await.unwrap(), r#"[{"id":"foo"},{"id":"bar"}]"#);
    }

    #[tokio::test]
    async fn list_passes_through_other_methods() {
        let route = builder().build().unwrap();
        assert!(matches!(route.handle(Request::new(Method::PUT, "/p")).await, Outcome::Next(_)));
    }

    #[tokio::test]
    async fn fetch_parses_id_and_version() {
        let seen = Arc::new(Mutex::new(None));
        let record = Arc::clone(&seen);
        let route = builder()
            .fetch(move |pkg, _| {
                *record.lock().unwrap() = Some(pkg);
                async { FetchResult::Empty }
            })
            .build()
            .unwrap();

        respond(&route, get("/p/foo-bar/1.0.0")).await;
        assert_eq!(*seen.lock().unwrap(), Some(PackageRef::new("foo-bar", "1.0.0")));

        respond(&route, get("/p/foo")).await;
        assert_eq!(*seen.lock().unwrap(), Some(PackageRef::new("foo", "")));
    }

    #[tokio::test]
    async fn missing_id_is_404_without_calling_handlers() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (on_fetch, on_exists) = (Arc::clone(&calls), Arc::clone(&calls));
        let route = builder()
            .fetch(move |_, _| {
                on_fetch.fetch_add(1, Ordering::SeqCst);
                async { FetchResult::Empty }
            })
            .exists(move |_, _| {
                on_exists.fetch_add(1, Ordering::SeqCst);
                async { true }
            })
            .build()
            .unwrap();

        assert_eq!(respond(&route, get("/p/")).await.code(), 404);
        assert_eq!(respond(&route, Request::new(Method::HEAD, "/p/")).await.code(), 404);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fetch_maps_each_result() {
        assert_eq!(respond(&fetching(|| None::<Bytes>), get("/p/foo")).await.code(), 404);

        let res = respond(&fetching(|| Bytes::from_static(b"tgz")), get("/p/foo")).await;
        assert_eq!(res.code(), 200);
        assert_eq!(res.into_bytes().await.unwrap(), "tgz");

        let res = respond(
            &fetching(|| -> ByteStream { stream::iter(vec![Ok(Bytes::from_static(b"t")), Ok(Bytes::from_static(b"gz"))]).boxed() }),
            get("/p/foo"),
        )
        .await;
        assert_eq!(res.code(), 200);
        assert!(res.is_streaming());
        assert_eq!(res.into_bytes().await.unwrap(), "tgz");

        let res = respond(&fetching(|| "http://cdn.example.com/foo.tgz"), get("/p/foo")).await;
        assert_eq!(res.code(), 302);
        assert_eq!(res.header("location"), Some("http://cdn.example.com/foo.tgz"));
    }

    #[tokio::test]
    async fn fetch_with_unsendable_redirect_fails() {
        let route = fetching(|| "bad\r\nlocation");
        match route.handle(get("/p/foo/1.0.0")).await {
            Outcome::Fail(err) => assert!(err.to_string().ends_with("foo@1.0.0")),
            other => panic!("expected a failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn exists_maps_to_200_or_404() {
        let route = builder()
            .exists(|pkg, _| async move { pkg.id() == Some("foo") })
            .build()
            .unwrap();
        assert_eq!(respond(&route, Request::new(Method::HEAD, "/p/foo")).await.code(), 200);
        assert_eq!(respond(&route, Request::new(Method::HEAD, "/p/bar")).await.code(), 404);
    }

    #[tokio::test]
    async fn exists_sees_the_client() {
        let route = builder()
            .exists(|_, client| async move { client.agent_id == "kpm" })
            .build()
            .unwrap();
        let req = Request::new(Method::HEAD, "/p/foo").with_header("x-kpm-agent", "kpm");
        assert_eq!(respond(&route, req).await.code(), 200);
    }

    #[tokio::test]
    async fn item_paths_pass_through_write_methods() {
        let route = builder().build().unwrap();
        for method in [Method::PUT, Method::DELETE, Method::POST] {
            assert!(matches!(route.handle(Request::new(method, "/p/foo")).await, Outcome::Next(_)));
        }
    }

    #[tokio::test]
    async fn reads_are_idempotent() {
        let route = builder()
            .list(|_, _| async { Some(vec![json!("foo")]) })
            .build()
            .unwrap();
        let first = respond(&route, get("/p")).await.into_bytes().await.unwrap();
        let second = respond(&route, get("/p")).await.into_bytes().await.unwrap();
        assert_eq!(first, second);
    }
}
