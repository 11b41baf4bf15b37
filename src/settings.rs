//! Deployment settings read from the environment.
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `KPR_ADDR` | `0.0.0.0:3000` | listen address |
//! | `KPR_PACKAGES_PATH` | `/p` | `packages` in the config document |
//! | `KPR_PUBLISHING` | `false` | `publishing` in the config document |
//! | `KPR_OWNER` | `false` | `owner` in the config document |

use std::net::SocketAddr;

use tracing::info;

use crate::error::{Error, Result};
use crate::routes::RegistryConfig;

/// Where to listen and what to advertise.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Settings {
    pub addr: SocketAddr,
    pub registry: RegistryConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            registry: RegistryConfig::default(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut settings = Self::default();

        if let Some(val) = lookup("KPR_ADDR") {
            settings.addr = val
                .parse()
                .map_err(|_| Error::Settings(format!("KPR_ADDR: invalid socket address `{val}`")))?;
        }
        if let Some(val) = lookup("KPR_PACKAGES_PATH") {
            settings.registry.packages = val;
        }
        if let Some(val) = lookup("KPR_PUBLISHING") {
            settings.registry.publishing = parse_flag("KPR_PUBLISHING", &val)?;
        }
        if let Some(val) = lookup("KPR_OWNER") {
            settings.registry.owner = parse_flag("KPR_OWNER", &val)?;
        }

        info!(addr = %settings.addr, publishing = settings.registry.publishing, owner = settings.registry.owner, "settings loaded");
        Ok(settings)
    }
}

fn parse_flag(key: &str, val: &str) -> Result<bool> {
    match val.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Settings(format!("{key}: expected a boolean, got `{val}`"))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<Settings> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_variables() {
        assert_eq!(load(&[]).unwrap(), Settings::default());
    }

    #[test]
    fn reads_every_variable() {
        let settings = load(&[
            ("KPR_ADDR", "127.0.0.1:8080"),
            ("KPR_PACKAGES_PATH", "/packages"),
            ("KPR_PUBLISHING", "true"),
            ("KPR_OWNER", "1"),
        ])
        .unwrap();
        assert_eq!(settings.addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(settings.registry, RegistryConfig { packages: "/packages".into(), publishing: true, owner: true });
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(load(&[("KPR_ADDR", "nowhere")]), Err(Error::Settings(_))));
        assert!(matches!(load(&[("KPR_OWNER", "maybe")]), Err(Error::Settings(_))));
    }
}
