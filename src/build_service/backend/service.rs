/*
   Copyright 2021 JFrog Ltd

   Licensed under the Apache License, Version 2.0 (the "License");
   you may not use this file except in compliance with the License.
   You may obtain a copy of the License at

       http://www.apache.org/licenses/LICENSE-2.0

   Unless required by applicable law or agreed to in writing, software
   distributed under the License is distributed on an "AS IS" BASIS,
   WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
   See the License for the specific language governing permissions and
   limitations under the License.
*/

use log::debug;
use reqwest::{Response, Url};

use crate::build_service::error::BuildError;
use crate::build_service::model::{BuildRequest, ProjectResponse};

/// HTTP client for the build backend.
#[derive(Clone)]
pub struct BackendService {
    http_client: reqwest::Client,
    backend_endpoint: String,
}

impl BackendService {
    pub fn new(backend_endpoint: &str) -> Self {
        BackendService {
            http_client: reqwest::Client::new(),
            backend_endpoint: backend_endpoint.trim_end_matches('/').to_owned(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.backend_endpoint
    }

    /// Appends `segments` to the backend endpoint. Each segment is
    /// percent-encoded, so a project ID always stays a single segment.
    fn endpoint_url(&self, segments: &[&str]) -> Result<Url, BuildError> {
        let mut url = Url::parse(&self.backend_endpoint)
            .map_err(|e| BuildError::BackendRequestFailure(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| {
                BuildError::BackendRequestFailure(format!(
                    "{} cannot be used as a base URL",
                    self.backend_endpoint
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn start_build(&self, request: &BuildRequest) -> Result<ProjectResponse, BuildError> {
        let start_build_endpoint = self.endpoint_url(&["api", "build"])?;
        debug!("POST {}", start_build_endpoint);

        let start_build_response = self
            .http_client
            .post(start_build_endpoint)
            .json(request)
            .send()
            .await?;

        parse_project_response(start_build_response).await
    }

    pub async fn get_project_status(&self, project_id: &str) -> Result<ProjectResponse, BuildError> {
        let get_project_status_endpoint = self.endpoint_url(&["api", "project", project_id])?;
        debug!("GET {}", get_project_status_endpoint);

        let get_project_status_response = self
            .http_client
            .get(get_project_status_endpoint)
            .send()
            .await?;

        parse_project_response(get_project_status_response).await
    }

    pub async fn download_artifact(&self, download_path: &str) -> Result<bytes::Bytes, BuildError> {
        let download_artifact_endpoint = format!("{}{}", self.backend_endpoint, download_path);
        debug!("GET {}", download_artifact_endpoint);

        let download_artifact_response = self
            .http_client
            .get(download_artifact_endpoint)
            .send()
            .await?;

        if download_artifact_response.status().is_success() {
            download_artifact_response
                .bytes()
                .await
                .map_err(|e| BuildError::InvalidBackendResponse(e.to_string()))
        } else {
            Err(BuildError::BackendEndpointFailure(
                download_artifact_response.status(),
            ))
        }
    }
}

/// The backend reports failures as JSON bodies on error status codes, so
/// the body is decoded whatever the status is.
async fn parse_project_response(response: Response) -> Result<ProjectResponse, BuildError> {
    let status = response.status();
    let body = response.bytes().await?;

    match serde_json::from_slice::<ProjectResponse>(&body) {
        Ok(project_response) => Ok(project_response),
        Err(_) if !status.is_success() => Err(BuildError::BackendEndpointFailure(status)),
        Err(e) => Err(BuildError::InvalidBackendResponse(e.to_string())),
    }
}

#[cfg(test)]
#[cfg(not(tarpaulin_include))]
mod tests {
    use super::*;
    use crate::build_service::model::{ProjectAnalysis, ProjectStatus};
    use httptest::{matchers, responders, Expectation, Server};
    use reqwest::StatusCode;

    #[test]
    fn backend_endpoint_with_trailing_slash() {
        let backend_service = BackendService::new("http://localhost:5000/");
        assert_eq!(backend_service.endpoint(), "http://localhost:5000");
    }

    #[test]
    fn backend_endpoint_without_trailing_slash() {
        let backend_service = BackendService::new("http://localhost:5000");
        assert_eq!(backend_service.endpoint(), "http://localhost:5000");
    }

    #[tokio::test]
    async fn start_build() {
        let request = BuildRequest::new("Create a calculator app").unwrap();

        let http_server = Server::run();
        http_server.expect(
            Expectation::matching(matchers::all_of!(
                matchers::request::method_path("POST", "/api/build"),
                matchers::request::body(matchers::json_decoded(matchers::eq(serde_json::json!(
                    { "description": "Create a calculator app" }
                ))))
            ))
            .respond_with(responders::json_encoded(serde_json::json!({
                "status": "completed",
                "project_id": "abc123",
                "analysis": { "app_type": "calculator" }
            }))),
        );

        let backend_service = BackendService::new(&http_server.url_str("/"));

        let project_response = backend_service.start_build(&request).await.unwrap();
        assert_eq!(
            project_response,
            ProjectResponse {
                status: "completed".to_owned(),
                project_id: Some("abc123".to_owned()),
                analysis: Some(ProjectAnalysis {
                    app_type: Some("calculator".to_owned())
                }),
                download: None,
                message: None,
            }
        );
    }

    #[tokio::test]
    async fn start_build_error_body_on_server_error() {
        let request = BuildRequest::new("Make a todo list app").unwrap();

        let http_server = Server::run();
        http_server.expect(
            Expectation::matching(matchers::request::method_path("POST", "/api/build"))
                .respond_with(responders::status_code(500).body(
                    r#"{"status": "error", "message": "Template not available"}"#,
                )),
        );

        let backend_service = BackendService::new(&http_server.url_str("/"));

        let project_response = backend_service.start_build(&request).await.unwrap();
        assert_eq!(project_response.project_status(), ProjectStatus::Error);
        assert_eq!(
            project_response.message.as_deref(),
            Some("Template not available")
        );
    }

    #[tokio::test]
    async fn start_build_invalid_response() {
        let request = BuildRequest::new("Make a todo list app").unwrap();

        let http_server = Server::run();
        http_server.expect(
            Expectation::matching(matchers::request::method_path("POST", "/api/build"))
                .respond_with(responders::status_code(200).body("<html>not json</html>")),
        );

        let backend_service = BackendService::new(&http_server.url_str("/"));

        let error = backend_service.start_build(&request).await.unwrap_err();
        assert!(matches!(error, BuildError::InvalidBackendResponse(_)));
    }

    #[tokio::test]
    async fn start_build_server_error() {
        let request = BuildRequest::new("Make a todo list app").unwrap();

        let http_server = Server::run();
        http_server.expect(
            Expectation::matching(matchers::request::method_path("POST", "/api/build"))
                .respond_with(responders::status_code(502)),
        );

        let backend_service = BackendService::new(&http_server.url_str("/"));

        let error = backend_service.start_build(&request).await.unwrap_err();

        match error {
            BuildError::BackendEndpointFailure(StatusCode::BAD_GATEWAY) => {}
            _ => panic!("Invalid BuildError: {}", error),
        }
    }

    #[tokio::test]
    #[should_panic(expected = "BackendRequestFailure")]
    async fn start_build_http_error() {
        let request = BuildRequest::new("Make a todo list app").unwrap();

        let backend_service = BackendService::new("");

        backend_service.start_build(&request).await.unwrap();
    }

    #[tokio::test]
    async fn get_project_status() {
        let http_server = Server::run();
        http_server.expect(
            Expectation::matching(matchers::request::method_path(
                "GET",
                "/api/project/abc123",
            ))
            .respond_with(responders::json_encoded(serde_json::json!({
                "status": "building",
                "project_id": "abc123"
            }))),
        );

        let backend_service = BackendService::new(&http_server.url_str("/"));

        let project_response = backend_service
            .get_project_status("abc123")
            .await
            .unwrap();
        assert_eq!(project_response.project_status(), ProjectStatus::Building);
        assert_eq!(project_response.project_id.as_deref(), Some("abc123"));
    }

    #[tokio::test]
    async fn get_project_status_escapes_project_id() {
        let http_server = Server::run();
        http_server.expect(
            Expectation::matching(matchers::request::method_path(
                "GET",
                "/api/project/..%2Fbuild%3Fx",
            ))
            .respond_with(responders::json_encoded(
                serde_json::json!({ "status": "building" }),
            )),
        );

        let backend_service = BackendService::new(&http_server.url_str("/"));

        let project_response = backend_service
            .get_project_status("../build?x")
            .await
            .unwrap();
        assert_eq!(project_response.project_status(), ProjectStatus::Building);
    }

    #[test]
    fn endpoint_url_keeps_base_path() {
        let backend_service = BackendService::new("http://localhost:5000/rahl/");
        assert_eq!(
            backend_service
                .endpoint_url(&["api", "project", "abc123"])
                .unwrap()
                .as_str(),
            "http://localhost:5000/rahl/api/project/abc123"
        );
    }

    #[tokio::test]
    async fn get_project_status_server_error() {
        let http_server = Server::run();
        http_server.expect(
            Expectation::matching(matchers::request::method_path(
                "GET",
                "/api/project/abc123",
            ))
            .respond_with(responders::status_code(404)),
        );

        let backend_service = BackendService::new(&http_server.url_str("/"));

        let error = backend_service
            .get_project_status("abc123")
            .await
            .unwrap_err();

        match error {
            BuildError::BackendEndpointFailure(StatusCode::NOT_FOUND) => {}
            _ => panic!("Invalid BuildError: {}", error),
        }
    }

    #[tokio::test]
    #[should_panic(expected = "BackendRequestFailure")]
    async fn get_project_status_http_error() {
        let backend_service = BackendService::new("");

        backend_service.get_project_status("abc123").await.unwrap();
    }

    #[tokio::test]
    async fn download_artifact() {
        let download_path = "/api/download/abc123";
        let artifact_bytes = bytes::Bytes::from("apk_bytes");

        let http_server = Server::run();
        http_server.expect(
            Expectation::matching(matchers::request::method_path("GET", download_path))
                .respond_with(responders::status_code(200).body(artifact_bytes.clone())),
        );

        let backend_service = BackendService::new(&http_server.url_str("/"));

        let download_artifact_result = backend_service
            .download_artifact(download_path)
            .await
            .unwrap();
        assert_eq!(download_artifact_result, artifact_bytes);
    }

    #[tokio::test]
    async fn download_artifact_server_error() {
        let download_path = "/api/download/abc123";

        let http_server = Server::run();
        http_server.expect(
            Expectation::matching(matchers::request::method_path("GET", download_path))
                .respond_with(responders::status_code(404)),
        );

        let backend_service = BackendService::new(&http_server.url_str("/"));

        let error = backend_service
            .download_artifact(download_path)
            .await
            .unwrap_err();

        match error {
            BuildError::BackendEndpointFailure(StatusCode::NOT_FOUND) => {}
            _ => panic!("Invalid BuildError: {}", error),
        }
    }
}
