//! Caller identity carried in the `x-kpm-*` request headers.

use crate::request::Request;

pub const AGENT_HEADER: &str = "x-kpm-agent";
pub const VERSION_HEADER: &str = "x-kpm-version";
pub const KEY_HEADER: &str = "x-kpm-key";

/// Who is calling, as far as the request headers say.
///
/// Built once per request and handed to every handler and to the
/// [`KeyVerifier`](crate::KeyVerifier). A header that is present but empty
/// stays `Some("")`, so a verifier can tell "no key" from "empty key".
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Client {
    pub agent_id: String,
    pub agent_version: Option<String>,
    pub key: Option<String>,
}

impl Client {
    pub fn from_request(req: &Request) -> Self {
        Self {
            agent_id: req.header(AGENT_HEADER).unwrap_or_default().to_owned(),
            agent_version: req.header(VERSION_HEADER).map(str::to_owned),
            key: req.header(KEY_HEADER).map(str::to_owned),
        }
    }
}
