//! Minimal kpr registry: packages and owners kept in memory.
//!
//! Run with:
//!   RUST_LOG=kpr=debug KPR_PUBLISHING=true KPR_OWNER=true cargo run --example basic
//!
//! Try:
//!   curl -X PUT http://localhost:3000/p/left-pad/1.0.0 \
//!        -H 'x-kpm-agent: alice' -H 'x-kpm-key: letmein' \
//!        --data-binary @left-pad-1.0.0.tgz
//!   curl http://localhost:3000/p
//!   curl -I http://localhost:3000/p/left-pad/1.0.0
//!   curl http://localhost:3000/o/left-pad
//!   curl -X POST http://localhost:3000/o/left-pad \
//!        -H 'x-kpm-agent: alice' -H 'x-kpm-key: letmein' \
//!        -H 'content-type: application/json' -d '{"user":"bob"}'
//!   curl http://localhost:3000/kpm-config.json

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use kpr::{Chain, Config, KeyVerifier, Owners, PackageRef, Packages, Publishing, Server, Settings, health};
use serde_json::json;
use tracing_subscriber::EnvFilter;

/// Every published archive, keyed by `(id, version)`, plus who owns each id.
#[derive(Default)]
struct Registry {
    archives: BTreeMap<(String, String), Bytes>,
    owners: BTreeMap<String, BTreeSet<String>>,
}

type Shared = Arc<Mutex<Registry>>;

fn key(pkg: &PackageRef) -> (String, String) {
    (pkg.id().unwrap_or_default().to_owned(), pkg.version.clone())
}

#[tokio::main]
async fn main() -> Result<(), kpr::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::from_env()?;
    let registry = Shared::default();

    // One key for the whole demo. A real host looks keys up per agent.
    let verifier = KeyVerifier::new(|client| async move { client.key.as_deref() == Some("letmein") });

    let app = Chain::new()
        .with(health::probes())
        .with(Config::new(settings.registry.clone()))
        .with(packages(&registry)?)
        .with(owners(&registry, verifier.clone())?)
        .with(publishing(&registry, verifier)?);

    Server::from_settings(&settings).serve(app).await
}

fn packages(registry: &Shared) -> kpr::Result<Packages> {
    let (list, exists, fetch) = (Arc::clone(registry), Arc::clone(registry), Arc::clone(registry));

    Packages::builder()
        .list(move |page, size| {
            let all = list.lock().map(|r| r.archives.keys().cloned().collect::<Vec<_>>()).unwrap_or_default();
            let page: Vec<_> = match usize::try_from(size) {
                Ok(size) => all.into_iter().skip(page.max(0) as usize * size).take(size).collect(),
                Err(_) => all,
            };
            let page: Vec<serde_json::Value> = page
                .into_iter()
                .map(|(id, version)| json!({ "id": id, "version": version }))
                .collect();
            async move { Some(page) }
        })
        .exists(move |pkg, _client| {
            let found = exists.lock().is_ok_and(|r| r.archives.contains_key(&key(&pkg)));
            async move { found }
        })
        .fetch(move |pkg, _client| {
            let archive = fetch.lock().ok().and_then(|r| r.archives.get(&key(&pkg)).cloned());
            async move { archive }
        })
        .build()
}

fn owners(registry: &Shared, verifier: KeyVerifier) -> kpr::Result<Owners> {
    let (list, add, remove) = (Arc::clone(registry), Arc::clone(registry), Arc::clone(registry));

    Owners::builder()
        .list(move |pkg, _client| {
            let owners: Option<Vec<String>> = list.lock().ok().and_then(|r| {
                r.owners.get(pkg.id().unwrap_or_default()).map(|set| set.iter().cloned().collect())
            });
            async move { owners }
        })
        .add(move |pkg, _client, user| {
            let added = add.lock().is_ok_and(|mut r| {
                r.owners.get_mut(pkg.id().unwrap_or_default()).is_some_and(|set| set.insert(user))
            });
            async move { added }
        })
        .remove(move |pkg, _client, user| {
            let removed = remove.lock().is_ok_and(|mut r| {
                r.owners.get_mut(pkg.id().unwrap_or_default()).is_some_and(|set| set.remove(&user))
            });
            async move { removed }
        })
        .verifier(verifier)
        .build()
}

fn publishing(registry: &Shared, verifier: KeyVerifier) -> kpr::Result<Publishing> {
    let (publish, unpublish) = (Arc::clone(registry), Arc::clone(registry));

    Publishing::builder()
        .publish(move |pkg, client, mut upload| {
            let registry = Arc::clone(&publish);
            async move {
                let mut archive = BytesMut::new();
                while let Some(chunk) = upload.next().await {
                    match chunk {
                        Ok(chunk) => archive.extend_from_slice(&chunk),
                        Err(e) => {
                            tracing::warn!(package = %pkg, "upload aborted: {e}");
                            return false;
                        }
                    }
                }

                let Ok(mut r) = registry.lock() else { return false };
                let key = key(&pkg);
                if r.archives.contains_key(&key) {
                    return false;
                }
                let owners = r.owners.entry(key.0.clone()).or_default();
                if !owners.is_empty() && !owners.contains(&client.agent_id) {
                    return false;
                }
                owners.insert(client.agent_id);
                r.archives.insert(key, archive.freeze());
                true
            }
        })
        .unpublish(move |pkg, _client| {
            let removed = unpublish.lock().is_ok_and(|mut r| r.archives.remove(&key(&pkg)).is_some());
            async move { removed }
        })
        .verifier(verifier)
        .build()
}
