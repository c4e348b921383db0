//! Identity service client.
//!
//! Ignored projects may be configured by name; names only mean something to
//! the identity service, so they are resolved to project ids once, at meter
//! construction. Entries that already look like project ids (32 hex chars,
//! dashes allowed) skip the lookup entirely, which keeps deployments without
//! identity credentials working.

use crate::config::IdentityConfig;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Request timeout for identity calls in seconds.
const IDENTITY_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Header carrying the issued token on an auth response.
const SUBJECT_TOKEN_HEADER: &str = "x-subject-token";

/// Errors from the identity service client.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Identity request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Identity service did not return a token")]
    MissingToken,
}

#[derive(Debug, Deserialize)]
struct ProjectsResponse {
    projects: Vec<ProjectRecord>,
}

#[derive(Debug, Deserialize)]
struct ProjectRecord {
    id: String,
}

/// Resolves project names to ids through the identity service.
pub struct ProjectResolver {
    client: reqwest::Client,
    config: IdentityConfig,
}

impl ProjectResolver {
    /// Create a resolver for the configured identity service.
    pub fn new(config: IdentityConfig) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(IDENTITY_REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(ProjectResolver { client, config })
    }

    /// Resolve a mixed list of project ids and names to project ids.
    ///
    /// Ids pass through untouched. Names that the identity service does not
    /// know are logged at warn level and dropped from the result.
    #[instrument(skip_all, name = "meter.identity.resolve")]
    pub async fn resolve(&self, entries: &[String]) -> Result<Vec<String>, IdentityError> {
        let mut resolved = Vec::with_capacity(entries.len());
        let mut token: Option<String> = None;

        for entry in entries {
            if looks_like_project_id(entry) {
                resolved.push(entry.clone());
                continue;
            }

            let auth = match &token {
                Some(token) => token.clone(),
                None => {
                    let issued = self.authenticate().await?;
                    token = Some(issued.clone());
                    issued
                }
            };

            match self.lookup_project(&auth, entry).await? {
                Some(id) => {
                    debug!(
                        target: "meter.identity",
                        project = %entry,
                        project_id = %id,
                        "Resolved ignored project"
                    );
                    resolved.push(id);
                }
                None => {
                    warn!(
                        target: "meter.identity",
                        project = %entry,
                        "Failed to find project in identity service, entry ignored"
                    );
                }
            }
        }

        Ok(resolved)
    }

    /// Password-authenticate and return the issued token.
    async fn authenticate(&self) -> Result<String, IdentityError> {
        let body = serde_json::json!({
            "auth": {
                "identity": {
                    "methods": ["password"],
                    "password": {
                        "user": {
                            "name": self.config.username,
                            "domain": { "id": "default" },
                            "password": self.config.password,
                        }
                    }
                },
                "scope": {
                    "project": {
                        "name": self.config.project_name,
                        "domain": { "id": "default" },
                    }
                }
            }
        });

        let response = self
            .client
            .post(format!("{}/v3/auth/tokens", self.config.url))
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        response
            .headers()
            .get(SUBJECT_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or(IdentityError::MissingToken)
    }

    /// Look up a project id by name; `None` when the name is unknown.
    async fn lookup_project(
        &self,
        token: &str,
        name: &str,
    ) -> Result<Option<String>, IdentityError> {
        let response: ProjectsResponse = self
            .client
            .get(format!("{}/v3/projects", self.config.url))
            .query(&[("name", name)])
            .header("x-auth-token", token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.projects.into_iter().next().map(|p| p.id))
    }
}

/// Project ids are 32 hex characters, optionally dashed (UUID form).
fn looks_like_project_id(entry: &str) -> bool {
    let hex: String = entry.chars().filter(|c| *c != '-').collect();
    hex.len() == 32 && hex.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn identity_config(url: String) -> IdentityConfig {
        IdentityConfig {
            url,
            username: "admin".to_string(),
            password: "secret".to_string(),
            project_name: "admin".to_string(),
        }
    }

    #[test]
    fn test_project_id_detection() {
        assert!(looks_like_project_id("cf0356aaac7c42bba5a744339a6169fa"));
        assert!(looks_like_project_id("cf0356aa-ac7c-42bb-a5a7-44339a6169fa"));
        assert!(!looks_like_project_id("gnocchi"));
        assert!(!looks_like_project_id("service"));
        assert!(!looks_like_project_id(""));
    }

    #[tokio::test]
    async fn test_ids_skip_the_identity_service() {
        // No mock server at all: ids must never trigger a lookup.
        let resolver =
            ProjectResolver::new(identity_config("http://127.0.0.1:9".to_string())).unwrap();
        let resolved = resolver
            .resolve(&["cf0356aaac7c42bba5a744339a6169fa".to_string()])
            .await
            .unwrap();
        assert_eq!(resolved, vec!["cf0356aaac7c42bba5a744339a6169fa"]);
    }

    #[tokio::test]
    async fn test_names_resolve_to_ids() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/auth/tokens"))
            .respond_with(
                ResponseTemplate::new(201).insert_header("x-subject-token", "tok-123"),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v3/projects"))
            .and(query_param("name", "service"))
            .and(header("x-auth-token", "tok-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "projects": [{"id": "147cc0a9263c4964926f3ee7b6ba3685", "name": "service"}]
            })))
            .mount(&server)
            .await;

        let resolver = ProjectResolver::new(identity_config(server.uri())).unwrap();
        let resolved = resolver.resolve(&["service".to_string()]).await.unwrap();
        assert_eq!(resolved, vec!["147cc0a9263c4964926f3ee7b6ba3685"]);
    }

    #[tokio::test]
    async fn test_unknown_name_is_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/auth/tokens"))
            .respond_with(
                ResponseTemplate::new(201).insert_header("x-subject-token", "tok-123"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v3/projects"))
            .and(query_param("name", "service"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "projects": [{"id": "147cc0a9263c4964926f3ee7b6ba3685", "name": "service"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v3/projects"))
            .and(query_param("name", "gnocchi"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "projects": [] })),
            )
            .mount(&server)
            .await;

        let resolver = ProjectResolver::new(identity_config(server.uri())).unwrap();
        let resolved = resolver
            .resolve(&["service".to_string(), "gnocchi".to_string()])
            .await
            .unwrap();
        assert_eq!(resolved, vec!["147cc0a9263c4964926f3ee7b6ba3685"]);
    }

    #[tokio::test]
    async fn test_auth_happens_once_for_many_names() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/auth/tokens"))
            .respond_with(
                ResponseTemplate::new(201).insert_header("x-subject-token", "tok-123"),
            )
            .expect(1)
            .mount(&server)
            .await;
        for (name, id) in [("alpha", "a".repeat(32)), ("beta", "b".repeat(32))] {
            Mock::given(method("GET"))
                .and(path("/v3/projects"))
                .and(query_param("name", name))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "projects": [{"id": id, "name": name}]
                })))
                .mount(&server)
                .await;
        }

        let resolver = ProjectResolver::new(identity_config(server.uri())).unwrap();
        let resolved = resolver
            .resolve(&["alpha".to_string(), "beta".to_string()])
            .await
            .unwrap();
        assert_eq!(resolved, vec!["a".repeat(32), "b".repeat(32)]);
    }

    #[tokio::test]
    async fn test_missing_token_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/auth/tokens"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let resolver = ProjectResolver::new(identity_config(server.uri())).unwrap();
        let result = resolver.resolve(&["service".to_string()]).await;
        assert!(matches!(result, Err(IdentityError::MissingToken)));
    }
}
