use url::Url;

use crate::entity::provider_type::ProviderType;

use super::errors::{ProviderError, Result};

/// A repository resolved from its web URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub provider: ProviderType,
    /// Canonical web URL: no `.git` suffix, no trailing slash.
    pub web_url: String,
    /// REST API root for the host, without trailing slash.
    pub api_base: String,
    /// Owner, group path (GitLab subgroups included) or workspace.
    pub namespace: String,
    pub name: String,
}

impl RepoRef {
    /// Resolve a repository URL for `provider`.
    ///
    /// Accepts `https://host/owner/repo`, trailing UI paths such as
    /// `/issues` or GitLab's `/-/issues`, a `.git` suffix, scp-style
    /// `git@host:owner/repo.git`, and scheme-less `host/owner/repo`.
    pub fn parse(provider: ProviderType, repository_url: &str) -> Result<Self> {
        let invalid = || ProviderError::InvalidRepository(repository_url.to_string());

        let normalized = normalize_input(repository_url.trim()).ok_or_else(invalid)?;
        let url = Url::parse(&normalized).map_err(|_| invalid())?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid());
        }
        let host = url.host_str().ok_or_else(invalid)?.to_ascii_lowercase();
        let origin = url.origin().ascii_serialization();

        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();

        let repo_segments: Vec<&str> = match provider {
            ProviderType::GitLab => segments.iter().copied().take_while(|s| *s != "-").collect(),
            ProviderType::GitHub | ProviderType::Bitbucket => {
                segments.iter().copied().take(2).collect()
            }
        };
        if repo_segments.len() < 2 {
            return Err(invalid());
        }

        let (name, namespace) = match repo_segments.split_last() {
            Some((last, rest)) => (last.trim_end_matches(".git").to_string(), rest.join("/")),
            None => return Err(invalid()),
        };
        if name.is_empty() || namespace.is_empty() {
            return Err(invalid());
        }

        let api_base = match provider {
            ProviderType::GitHub if host == "github.com" || host == "www.github.com" => {
                "https://api.github.com".to_string()
            }
            ProviderType::GitHub => format!("{origin}/api/v3"),
            ProviderType::GitLab => format!("{origin}/api/v4"),
            ProviderType::Bitbucket if host == "bitbucket.org" || host == "www.bitbucket.org" => {
                "https://api.bitbucket.org/2.0".to_string()
            }
            ProviderType::Bitbucket => format!("{origin}/api/2.0"),
        };

        Ok(Self {
            provider,
            web_url: format!("{origin}/{namespace}/{name}"),
            api_base,
            namespace,
            name,
        })
    }

    /// Point API calls somewhere else (self-hosted proxies, tests).
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// `namespace/name`.
    pub fn full_path(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    /// Full path as a single URL path segment (`group%2Fproject`).
    pub fn encoded_path(&self) -> String {
        url::form_urlencoded::byte_serialize(self.full_path().as_bytes()).collect()
    }
}

fn normalize_input(input: &str) -> Option<String> {
    if input.is_empty() {
        return None;
    }
    if input.contains("://") {
        return Some(input.to_string());
    }
    if let Some(rest) = input.strip_prefix("git@") {
        let (host, path) = rest.split_once(':')?;
        return Some(format!("https://{host}/{path}"));
    }
    Some(format!("https://{input}"))
}
