use tracing::warn;
use vigil_core::{VigilError, VigilResult};

/// Base URLs the netdata tools are allowed to query.
///
/// A URL passes if it equals a configured host or is nested under one, which
/// covers mirrored children reached through `{parent}/host/{name}`. An empty
/// policy allows any `http`/`https` URL.
#[derive(Debug, Clone, Default)]
pub struct HostPolicy {
    allowed: Vec<String>,
}

impl HostPolicy {
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed: hosts
                .into_iter()
                .map(|h| normalize(h.as_ref()))
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }

    pub fn hosts(&self) -> &[String] {
        &self.allowed
    }

    pub fn allows(&self, url: &str) -> bool {
        let url = normalize(url);
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return false;
        }
        self.allowed.is_empty()
            || self
                .allowed
                .iter()
                .any(|h| url == *h || url.starts_with(&format!("{h}/")))
    }

    /// Normalized base URL, or a validation error naming the allowed hosts.
    pub fn check(&self, url: &str) -> VigilResult<String> {
        if self.allows(url) {
            Ok(normalize(url))
        } else {
            warn!(url = %url, "Refusing to query a host outside the configured set");
            Err(VigilError::Validation(format!(
                "host not allowed: '{url}'. Configured hosts: {}",
                self.allowed.join(", ")
            )))
        }
    }
}

fn normalize(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
