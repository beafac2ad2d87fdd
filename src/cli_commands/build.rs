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

use anyhow::{anyhow, Context, Result};
use log::debug;
use std::path::{Path, PathBuf};

use super::config::{get_config, valid_api_url};
use crate::build_service::service::BuildService;
use crate::util::env_util::read_var;

/// Environment variable holding the backend base URL.
pub const RAHL_API_URL: &str = "RAHL_API_URL";

/// Resolves the backend base URL: an explicit value wins, then
/// [`RAHL_API_URL`], then the stored CLI configuration (which falls back to
/// the local development endpoint).
pub fn resolve_api_url(api_url: Option<&str>) -> Result<String> {
    if let Some(api_url) = api_url {
        debug!("Using API URL from command line");
        return valid_api_url(api_url.to_owned()).map_err(|e| anyhow!(e));
    }

    if let Some(env_api_url) = read_var(RAHL_API_URL) {
        debug!("Using API URL from {}", RAHL_API_URL);
        return valid_api_url(env_api_url).map_err(|e| anyhow!(e));
    }

    let cli_config = get_config().context("could not read CLI configuration")?;
    valid_api_url(cli_config.api_url).map_err(|e| anyhow!(e))
}

pub fn build_service(api_url: Option<&str>) -> Result<BuildService> {
    Ok(BuildService::new(&resolve_api_url(api_url)?))
}

/// Downloads the APK of a finished project to `output`, or to
/// `<project_id>.apk` in the working directory. The project status is
/// checked first so the download location reported by the backend is used.
pub async fn download_apk(
    api_url: Option<&str>,
    project_id: &str,
    output: Option<&Path>,
) -> Result<PathBuf> {
    let build_service = build_service(api_url)?;
    build_service.resume(project_id).await?;

    let outcome = build_service
        .recheck_status(project_id)
        .await
        .with_context(|| format!("could not get status of project {}", project_id))?;
    debug!("Downloading APK of {}", outcome);

    let apk = build_service
        .download_artifact()
        .await
        .with_context(|| format!("could not download APK for project {}", project_id))?;

    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(format!("{}.apk", project_id)));
    std::fs::write(&output, &apk)
        .with_context(|| format!("could not write APK to {}", output.display()))?;

    Ok(output)
}

#[cfg(test)]
#[cfg(not(tarpaulin_include))]
mod tests {
    use super::*;
    use crate::build_service::error::BuildError;
    use crate::cli_commands::config::{add_config, CliConfig, DEFAULT_API_URL};
    use crate::util::test_util::tests::{setup, teardown};
    use httptest::{matchers, responders, Expectation, Server};
    use serial_test::serial;
    use std::env;

    #[test]
    #[serial]
    fn test_resolve_api_url_precedence() {
        let tmp_dir = setup();
        env::remove_var(RAHL_API_URL);

        assert_eq!(resolve_api_url(None).unwrap(), DEFAULT_API_URL);

        add_config(CliConfig {
            api_url: "http://from-config:5000".to_owned(),
        })
        .unwrap();
        assert_eq!(resolve_api_url(None).unwrap(), "http://from-config:5000");

        env::set_var(RAHL_API_URL, "http://from-env:5000/");
        assert_eq!(resolve_api_url(None).unwrap(), "http://from-env:5000");

        assert_eq!(
            resolve_api_url(Some("https://from-flag")).unwrap(),
            "https://from-flag"
        );

        env::remove_var(RAHL_API_URL);
        teardown(tmp_dir);
    }

    #[test]
    #[serial]
    fn test_resolve_invalid_api_url() {
        assert!(resolve_api_url(Some("not a url")).is_err());
    }

    #[tokio::test]
    #[serial]
    async fn test_download_apk() {
        let tmp_dir = setup();

        let http_server = Server::run();
        http_server.expect(
            Expectation::matching(matchers::request::method_path(
                "GET",
                "/api/project/abc123",
            ))
            .respond_with(responders::json_encoded(serde_json::json!({
                "status": "completed",
                "project_id": "abc123"
            }))),
        );
        http_server.expect(
            Expectation::matching(matchers::request::method_path(
                "GET",
                "/api/download/abc123",
            ))
            .respond_with(responders::status_code(200).body("apk_bytes")),
        );

        let api_url = http_server.url_str("/");
        let output = tmp_dir.join("calculator.apk");
        let written = download_apk(Some(api_url.as_str()), "abc123", Some(output.as_path()))
            .await
            .unwrap();

        assert_eq!(written, output);
        assert_eq!(std::fs::read(&output).unwrap(), b"apk_bytes");

        teardown(tmp_dir);
    }

    #[tokio::test]
    #[serial]
    async fn test_download_apk_from_reported_path() {
        let tmp_dir = setup();

        let http_server = Server::run();
        http_server.expect(
            Expectation::matching(matchers::request::method_path("GET", "/api/project/p1"))
                .respond_with(responders::json_encoded(serde_json::json!({
                    "status": "completed",
                    "project_id": "p1",
                    "download": "/files/p1.apk"
                }))),
        );
        http_server.expect(
            Expectation::matching(matchers::request::method_path("GET", "/files/p1.apk"))
                .respond_with(responders::status_code(200).body("p1_apk")),
        );

        let api_url = http_server.url_str("/");
        let output = tmp_dir.join("p1.apk");
        download_apk(Some(api_url.as_str()), "p1", Some(output.as_path()))
            .await
            .unwrap();

        assert_eq!(std::fs::read(&output).unwrap(), b"p1_apk");

        teardown(tmp_dir);
    }

    #[tokio::test]
    #[serial]
    async fn test_download_apk_still_building() {
        let tmp_dir = setup();

        let http_server = Server::run();
        http_server.expect(
            Expectation::matching(matchers::request::method_path("GET", "/api/project/p1"))
                .respond_with(responders::json_encoded(serde_json::json!({
                    "status": "building",
                    "project_id": "p1"
                }))),
        );

        let api_url = http_server.url_str("/");
        let output = tmp_dir.join("p1.apk");
        let error = download_apk(Some(api_url.as_str()), "p1", Some(output.as_path()))
            .await
            .unwrap_err();

        assert!(matches!(
            error.downcast_ref::<BuildError>(),
            Some(BuildError::JobNotCompleted(_))
        ));
        assert!(!output.exists());

        teardown(tmp_dir);
    }
}
