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

use serde::{Deserialize, Serialize};
use std::fmt::Display;

use super::error::BuildError;

/// Message shown for every submission that never got a usable answer
/// from the backend.
pub const CONNECT_FAILURE_MESSAGE: &str =
    "Failed to connect to server. Make sure backend is running.";

/// App type reported when the backend analysis does not name one.
pub const DEFAULT_APP_TYPE: &str = "webview";

const BACKEND_ERROR_MESSAGE: &str = "Build failed without a message from the backend.";

/// Download location of a finished build when the backend does not return one.
pub fn default_download_path(project_id: &str) -> String {
    format!("/api/download/{}", project_id)
}

/// Checks that a project ID given by a user can stand as a single URL path
/// segment of the backend's project and download endpoints.
pub fn valid_project_id(project_id: &str) -> Result<&str, BuildError> {
    if project_id.trim().is_empty() {
        return Err(BuildError::EmptyProjectId);
    }
    let reserved = |c: char| {
        matches!(c, '/' | '\\' | '?' | '#' | '%') || c.is_whitespace() || c.is_control()
    };
    if project_id == "." || project_id == ".." || project_id.chars().any(reserved) {
        return Err(BuildError::InvalidProjectId(project_id.to_owned()));
    }
    Ok(project_id)
}

/// A validated build request. The description is sent untrimmed.
#[derive(Clone, Debug, Serialize, Eq, PartialEq)]
pub struct BuildRequest {
    description: String,
}

impl BuildRequest {
    pub fn new(description: &str) -> Result<Self, BuildError> {
        if description.trim().is_empty() {
            return Err(BuildError::EmptyDescription);
        }
        Ok(BuildRequest {
            description: description.to_owned(),
        })
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, Eq, PartialEq)]
pub struct ProjectAnalysis {
    pub app_type: Option<String>,
}

/// Body returned by both `POST /api/build` and `GET /api/project/{id}`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, Eq, PartialEq)]
pub struct ProjectResponse {
    pub status: String,
    pub project_id: Option<String>,
    pub analysis: Option<ProjectAnalysis>,
    pub download: Option<String>,
    pub message: Option<String>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ProjectStatus {
    Building,
    Completed,
    Error,
    Other(String),
}

impl From<&str> for ProjectStatus {
    fn from(status: &str) -> Self {
        match status {
            "building" => ProjectStatus::Building,
            "completed" => ProjectStatus::Completed,
            "error" => ProjectStatus::Error,
            other => ProjectStatus::Other(other.to_owned()),
        }
    }
}

impl ProjectResponse {
    pub fn project_status(&self) -> ProjectStatus {
        ProjectStatus::from(self.status.as_str())
    }

    pub fn app_type(&self) -> Option<&str> {
        self.analysis
            .as_ref()
            .and_then(|analysis| analysis.app_type.as_deref())
    }

    pub fn error_message(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| BACKEND_ERROR_MESSAGE.to_owned())
    }

    /// Maps the answer to a fresh submission. Any status other than
    /// `error` or `completed` is an in-progress job.
    pub fn into_submitted_outcome(self) -> Result<JobOutcome, BuildError> {
        if self.project_status() == ProjectStatus::Error {
            return Ok(JobOutcome::Error {
                message: self.error_message(),
            });
        }

        let project_id = match self.project_id.as_deref() {
            Some(project_id) if !project_id.is_empty() => project_id.to_owned(),
            _ => {
                return Err(BuildError::InvalidBackendResponse(format!(
                    "status '{}' without a project id",
                    self.status
                )))
            }
        };

        Ok(match self.project_status() {
            ProjectStatus::Completed => JobOutcome::completed(
                project_id,
                self.app_type().map(str::to_owned),
                self.download.clone(),
            ),
            _ => JobOutcome::Building { project_id },
        })
    }
}

/// Client side view of a build job.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum JobOutcome {
    #[default]
    None,
    Error {
        message: String,
    },
    Building {
        project_id: String,
    },
    Completed {
        project_id: String,
        app_type: String,
        download_path: String,
    },
}

impl JobOutcome {
    /// Builds a `Completed` outcome, deriving whatever the backend left out.
    pub fn completed(
        project_id: String,
        app_type: Option<String>,
        download_path: Option<String>,
    ) -> Self {
        let download_path = download_path
            .filter(|path| !path.is_empty())
            .unwrap_or_else(|| default_download_path(&project_id));
        JobOutcome::Completed {
            app_type: app_type.unwrap_or_else(|| DEFAULT_APP_TYPE.to_owned()),
            project_id,
            download_path,
        }
    }

    pub fn connect_failure() -> Self {
        JobOutcome::Error {
            message: CONNECT_FAILURE_MESSAGE.to_owned(),
        }
    }

    pub fn project_id(&self) -> Option<&str> {
        match self {
            JobOutcome::Building { project_id } | JobOutcome::Completed { project_id, .. } => {
                Some(project_id)
            }
            JobOutcome::None | JobOutcome::Error { .. } => None,
        }
    }

    pub fn is_building(&self) -> bool {
        matches!(self, JobOutcome::Building { .. })
    }

    pub fn is_building_job(&self, id: &str) -> bool {
        matches!(self, JobOutcome::Building { project_id } if project_id == id)
    }

    /// `Error` and `Completed` end the job they describe.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobOutcome::Error { .. } | JobOutcome::Completed { .. })
    }

    /// Absolute download location for a completed job.
    pub fn download_url(&self, base_url: &str) -> Option<String> {
        match self {
            JobOutcome::Completed { download_path, .. } => Some(format!(
                "{}{}",
                base_url.trim_end_matches('/'),
                download_path
            )),
            _ => None,
        }
    }
}

impl Display for JobOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let outcome = match self {
            JobOutcome::None => String::from("NONE"),
            JobOutcome::Error { message } => format!("ERROR - {}", message),
            JobOutcome::Building { project_id } => format!("BUILDING - (Project: {})", project_id),
            JobOutcome::Completed {
                project_id,
                app_type,
                download_path,
            } => format!(
                "COMPLETED - (Project: {}, App type: {}, Download: {})",
                project_id, app_type, download_path
            ),
        };
        write!(f, "{}", outcome)
    }
}
