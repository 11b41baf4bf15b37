//! Package references and the path matching the routes share.
//!
//! Every registry path has the shape `<prefix><id>[/<version>]`. The routes
//! test the prefix, then slice the remainder into a [`PackageRef`].

use std::fmt;

/// True iff `path` is exactly the route's base path.
pub fn matches_exact(path: &str, base: &str) -> bool {
    path == base
}

/// True iff `path` sits under `prefix`. The prefix carries its trailing `/`.
pub fn matches_prefix(path: &str, prefix: &str) -> bool {
    path.starts_with(prefix)
}

/// A package addressed by a request path.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PackageRef {
    /// `None` only when nothing follows the route prefix.
    pub id: Option<String>,
    /// Empty when the path names no version.
    pub version: String,
}

impl PackageRef {
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self { id: Some(id.into()), version: version.into() }
    }

    /// Parses the segment of `path` that starts at byte `start`.
    ///
    /// The id runs up to the first `/`. With `has_version`, everything after
    /// that separator is the version; without it the rest is ignored. A `/`
    /// at the very start of the remainder does not count as a separator.
    pub fn from_path(path: &str, start: usize, has_version: bool) -> Self {
        let rest = path.get(start..).unwrap_or_default();
        if rest.is_empty() {
            return Self::default();
        }

        match rest.find('/').filter(|&end| end > 0) {
            Some(end) => Self {
                id: Some(rest[..end].to_owned()),
                version: if has_version { rest[end + 1..].to_owned() } else { String::new() },
            },
            None => Self { id: Some(rest.to_owned()), version: String::new() },
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

/// `id@version`, the form used in logs and error messages.
impl fmt::Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id.as_deref().unwrap_or("null"), self.version)
    }
}
