use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{BoardError, Result};
use crate::target::Target;

use super::types::{Build, ResourceVersion};

/// Bearer-authenticated, read-only client for the CI server's JSON API.
///
/// Cheap to clone: clones share the underlying connection pool.
#[derive(Clone)]
pub struct ConcourseClient {
    client: Client,
    api_url: Url,
}

impl ConcourseClient {
    /// Builds a client for a saved target.
    ///
    /// Every request carries `Authorization: {type} {value}` from the
    /// target's token.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the target URL is invalid or the
    /// token cannot be used as a header value.
    pub fn new(target: &Target) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&target.token.header_value())
            .map_err(|e| BoardError::Config(format!("Invalid token for target: {e}")))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .user_agent(concat!("progress-board/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .danger_accept_invalid_certs(target.insecure)
            .build()
            .map_err(|e| BoardError::Config(format!("Failed to create HTTP client: {e}")))?;

        let base = Url::parse(&format!("{}/", target.api.trim_end_matches('/')))
            .map_err(|e| BoardError::Config(format!("Invalid base URL: {e}")))?;

        let api_url = base
            .join("api/v1/")
            .map_err(|e| BoardError::Config(format!("Invalid API base URL: {e}")))?;

        Ok(Self { client, api_url })
    }

    /// Lists the latest `limit` versions of a resource, newest first.
    pub async fn list_recent_versions(
        &self,
        team: &str,
        pipeline: &str,
        resource: &str,
        limit: usize,
    ) -> Result<Vec<ResourceVersion>> {
        let mut url = self.versions_url(team, pipeline, resource)?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());

        self.get_json(url).await
    }

    /// Lists the builds that consumed the given version as an input.
    pub async fn list_builds_consuming_version(
        &self,
        team: &str,
        pipeline: &str,
        resource: &str,
        version_id: u64,
    ) -> Result<Vec<Build>> {
        let mut url = self.versions_url(team, pipeline, resource)?;
        url.path_segments_mut()
            .map_err(|()| BoardError::Config("API URL cannot be a base".into()))?
            .push(&version_id.to_string())
            .push("input_to");

        self.get_json(url).await
    }

    fn versions_url(&self, team: &str, pipeline: &str, resource: &str) -> Result<Url> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|()| BoardError::Config("API URL cannot be a base".into()))?
            .pop_if_empty()
            .extend([
                "teams",
                team,
                "pipelines",
                pipeline,
                "resources",
                resource,
                "versions",
            ]);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!("GET {url}");
        let response = self.client.get(url).send().await?;

        let status = response.status();
        debug!("Response code: {status}");

        if status == StatusCode::UNAUTHORIZED {
            return Err(BoardError::Unauthorized);
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(BoardError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| BoardError::MalformedResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concourse::types::BuildStatus;
    use crate::target::TargetToken;
    use mockito::Matcher;

    fn create_target(api: &str) -> Target {
        Target {
            name: "test".to_string(),
            api: api.to_string(),
            team: "main".to_string(),
            insecure: false,
            token: TargetToken {
                token_type: "Bearer".to_string(),
                value: "tok-123".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_list_recent_versions() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/teams/main/pipelines/app/resources/repo/versions")
            .match_query(Matcher::UrlEncoded("limit".into(), "5".into()))
            .match_header("authorization", "Bearer tok-123")
            .with_status(200)
            .with_body(
                r#"[{"id": 2, "version": {"ref": "def"}, "enabled": true},
                    {"id": 1, "version": {"ref": "abc"}, "enabled": true}]"#,
            )
            .create_async()
            .await;

        let client = ConcourseClient::new(&create_target(&server.url())).unwrap();
        let versions = client
            .list_recent_versions("main", "app", "repo", 5)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].id, 2);
        assert_eq!(versions[1].version.get("ref").map(String::as_str), Some("abc"));
    }

    #[tokio::test]
    async fn test_list_builds_consuming_version() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock(
                "GET",
                "/api/v1/teams/main/pipelines/app/resources/repo/versions/17/input_to",
            )
            .match_header("authorization", "Bearer tok-123")
            .with_status(200)
            .with_body(r#"[{"job_name": "build", "status": "succeeded"}]"#)
            .create_async()
            .await;

        let client = ConcourseClient::new(&create_target(&server.url())).unwrap();
        let builds = client
            .list_builds_consuming_version("main", "app", "repo", 17)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(
            builds,
            vec![Build {
                job_name: "build".to_string(),
                status: BuildStatus::Succeeded,
            }]
        );
    }

    #[tokio::test]
    async fn test_path_segments_are_encoded() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock(
                "GET",
                "/api/v1/teams/main/pipelines/my%20app/resources/repo%2Fmain/versions",
            )
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let client = ConcourseClient::new(&create_target(&server.url())).unwrap();
        let versions = client
            .list_recent_versions("main", "my app", "repo/main", 5)
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(versions.is_empty());
    }

    #[tokio::test]
    async fn test_unauthorized() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", Matcher::Any)
            .with_status(401)
            .create_async()
            .await;

        let client = ConcourseClient::new(&create_target(&server.url())).unwrap();
        let err = client
            .list_recent_versions("main", "app", "repo", 5)
            .await
            .unwrap_err();

        assert!(matches!(err, BoardError::Unauthorized));
    }

    #[tokio::test]
    async fn test_other_status_is_api_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", Matcher::Any)
            .with_status(404)
            .with_body("resource not found")
            .create_async()
            .await;

        let client = ConcourseClient::new(&create_target(&server.url())).unwrap();
        let err = client
            .list_builds_consuming_version("main", "app", "repo", 3)
            .await
            .unwrap_err();

        match err {
            BoardError::Api { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "resource not found");
            }
            other => panic!("expected API error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", Matcher::Any)
            .with_status(200)
            .with_body("{not json")
            .create_async()
            .await;

        let client = ConcourseClient::new(&create_target(&server.url())).unwrap();
        let err = client
            .list_recent_versions("main", "app", "repo", 5)
            .await
            .unwrap_err();

        assert!(matches!(err, BoardError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        // Nothing listens on port 9 of localhost in the test environment.
        let client = ConcourseClient::new(&create_target("http://127.0.0.1:9")).unwrap();
        let err = client
            .list_recent_versions("main", "app", "repo", 5)
            .await
            .unwrap_err();

        assert!(matches!(err, BoardError::Network(_)));
    }

    #[test]
    fn test_base_url_with_path_prefix() {
        let client = ConcourseClient::new(&create_target("https://ci.example.com/concourse/")).unwrap();
        let url = client.versions_url("main", "app", "repo").unwrap();

        assert_eq!(
            url.as_str(),
            "https://ci.example.com/concourse/api/v1/teams/main/pipelines/app/resources/repo/versions"
        );
    }
}
