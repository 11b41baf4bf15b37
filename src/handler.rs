//! Registry handler types and their type erasure.
//!
//! # How async handlers are stored
//!
//! A route holds handlers the host wrote as plain `async` closures, each
//! with its own concrete closure and future type. The route struct can only
//! name one type per field, so every handler is wrapped once, at build time,
//! into an `Arc<dyn Fn(..) -> BoxFuture<..>>`:
//!
//! ```text
//! |pkg, client| async move { store.fetch(&pkg).await }   ← host writes this
//!        ↓ Packages::builder().fetch(closure)
//! Arc::new(move |pkg, client| Box::pin(async { closure(pkg, client).await.into() }))
//!        ↓  stored as FetchFn
//! (route.fetch)(pkg, client).await  at request time     ← one vtable dispatch
//! ```
//!
//! The per-request cost is one boxed future and one virtual call.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use crate::client::Client;
use crate::fetch::FetchResult;
use crate::package::PackageRef;
use crate::response::ByteStream;

/// A heap-allocated, type-erased future.
///
/// `Send` lets tokio move the request task across worker threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// `list(page, size)`: one page of the package index, `None` for nothing.
pub(crate) type ListFn = Arc<dyn Fn(i64, i64) -> BoxFuture<'static, Option<Vec<Value>>> + Send + Sync>;

/// `exists(pkg, client)` and `unpublish(pkg, client)`: a yes/no answer.
pub(crate) type PackageFn = Arc<dyn Fn(PackageRef, Client) -> BoxFuture<'static, bool> + Send + Sync>;

/// `fetch(pkg, client)`.
pub(crate) type FetchFn = Arc<dyn Fn(PackageRef, Client) -> BoxFuture<'static, FetchResult> + Send + Sync>;

/// Owner `list(pkg, client)`.
pub(crate) type OwnersFn = Arc<dyn Fn(PackageRef, Client) -> BoxFuture<'static, Option<Vec<String>>> + Send + Sync>;

/// Owner `add(pkg, client, user)` and `remove(pkg, client, user)`.
pub(crate) type OwnerChangeFn = Arc<dyn Fn(PackageRef, Client, String) -> BoxFuture<'static, bool> + Send + Sync>;

/// `publish(pkg, client, upload)`.
pub(crate) type PublishFn = Arc<dyn Fn(PackageRef, Client, ByteStream) -> BoxFuture<'static, bool> + Send + Sync>;

// ── Wrappers ──────────────────────────────────────────────────────────────────
//
// One per stored shape. Each calls the host closure and boxes its future.

pub(crate) fn list_fn<F, Fut>(f: F) -> ListFn
where
    F: Fn(i64, i64) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Option<Vec<Value>>> + Send + 'static,
{
    Arc::new(move |page: i64, size: i64| -> BoxFuture<'static, Option<Vec<Value>>> {
        Box::pin(f(page, size))
    })
}

pub(crate) fn package_fn<F, Fut>(f: F) -> PackageFn
where
    F: Fn(PackageRef, Client) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    Arc::new(move |pkg: PackageRef, client: Client| -> BoxFuture<'static, bool> {
        Box::pin(f(pkg, client))
    })
}

/// `R: Into<FetchResult>` lets a fetch handler return `Option<Bytes>`, a
/// redirect `String`, a `ByteStream` and so on.
pub(crate) fn fetch_fn<F, Fut, R>(f: F) -> FetchFn
where
    F: Fn(PackageRef, Client) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: Into<FetchResult>,
{
    Arc::new(move |pkg: PackageRef, client: Client| -> BoxFuture<'static, FetchResult> {
        let fut = f(pkg, client);
        Box::pin(async move { fut.await.into() })
    })
}

pub(crate) fn owners_fn<F, Fut>(f: F) -> OwnersFn
where
    F: Fn(PackageRef, Client) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Option<Vec<String>>> + Send + 'static,
{
    Arc::new(move |pkg: PackageRef, client: Client| -> BoxFuture<'static, Option<Vec<String>>> {
        Box::pin(f(pkg, client))
    })
}

pub(crate) fn owner_change_fn<F, Fut>(f: F) -> OwnerChangeFn
where
    F: Fn(PackageRef, Client, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    Arc::new(move |pkg: PackageRef, client: Client, user: String| -> BoxFuture<'static, bool> {
        Box::pin(f(pkg, client, user))
    })
}

pub(crate) fn publish_fn<F, Fut>(f: F) -> PublishFn
where
    F: Fn(PackageRef, Client, ByteStream) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    Arc::new(move |pkg: PackageRef, client: Client, upload: ByteStream| -> BoxFuture<'static, bool> {
        Box::pin(f(pkg, client, upload))
    })
}
