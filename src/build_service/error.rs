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

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum BuildError {
    #[error("App description must not be empty")]
    EmptyDescription,
    #[error("Project ID must not be empty")]
    EmptyProjectId,
    #[error("Invalid project ID: {0}")]
    InvalidProjectId(String),
    #[error("Project is not completed: {0}")]
    JobNotCompleted(String),
    #[error("Request to backend endpoint failed with status {0}")]
    BackendEndpointFailure(StatusCode),
    #[error("Failed to connect to backend endpoint: {0}")]
    BackendRequestFailure(String),
    #[error("Invalid response from backend: {0}")]
    InvalidBackendResponse(String),
}

impl BuildError {
    /// Whether the backend could not be reached or understood, as opposed
    /// to a request rejected before it was sent.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            BuildError::BackendEndpointFailure(_)
                | BuildError::BackendRequestFailure(_)
                | BuildError::InvalidBackendResponse(_)
        )
    }
}

impl From<reqwest::Error> for BuildError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            BuildError::InvalidBackendResponse(error.to_string())
        } else {
            BuildError::BackendRequestFailure(error.to_string())
        }
    }
}
