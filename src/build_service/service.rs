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

use log::{debug, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

use super::backend::service::BackendService;
use super::error::BuildError;
use super::model::{valid_project_id, BuildRequest, JobOutcome, ProjectStatus};

/// The job currently tracked by the build service. Every submit, resume
/// or reset starts a new generation; results belonging to an older
/// generation are dropped.
#[derive(Debug, Default)]
struct TrackedJob {
    generation: u64,
    outcome: JobOutcome,
    app_type: Option<String>,
}

/// Marks the generation whose re-check is outstanding. Cleared on drop so
/// an abandoned re-check future does not block later ones.
struct RecheckGuard<'a> {
    in_flight: &'a AtomicU64,
    generation: u64,
}

impl<'a> RecheckGuard<'a> {
    fn acquire(in_flight: &'a AtomicU64, generation: u64) -> Option<Self> {
        if in_flight.swap(generation, Ordering::SeqCst) == generation {
            None
        } else {
            Some(RecheckGuard {
                in_flight,
                generation,
            })
        }
    }
}

impl Drop for RecheckGuard<'_> {
    fn drop(&mut self) {
        let _ = self.in_flight.compare_exchange(
            self.generation,
            0,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }
}

/// The build service submits app descriptions to the build backend and
/// tracks the resulting job until the backend reports it as completed.
///
/// Exactly one [`JobOutcome`] is live at a time. The lock around it is
/// never held while a backend request is outstanding.
pub struct BuildService {
    backend_service: BackendService,
    tracked_job: Mutex<TrackedJob>,
    recheck_in_flight: AtomicU64,
}

impl BuildService {
    pub fn new(backend_endpoint: &str) -> Self {
        BuildService {
            backend_service: BackendService::new(backend_endpoint),
            tracked_job: Mutex::new(TrackedJob::default()),
            recheck_in_flight: AtomicU64::new(0),
        }
    }

    pub fn backend_endpoint(&self) -> &str {
        self.backend_service.endpoint()
    }

    pub async fn current_outcome(&self) -> JobOutcome {
        self.tracked_job.lock().await.outcome.clone()
    }

    /// Absolute download location once the tracked job has completed.
    pub async fn download_url(&self) -> Option<String> {
        self.current_outcome()
            .await
            .download_url(self.backend_service.endpoint())
    }

    /// Fetches the APK of the tracked job from the download path recorded
    /// when it completed.
    pub async fn download_artifact(&self) -> Result<bytes::Bytes, BuildError> {
        match self.current_outcome().await {
            JobOutcome::Completed { download_path, .. } => {
                self.backend_service.download_artifact(&download_path).await
            }
            outcome => Err(BuildError::JobNotCompleted(outcome.to_string())),
        }
    }

    pub async fn reset(&self) {
        self.start_job(JobOutcome::None).await;
    }

    /// Starts tracking a job submitted earlier, e.g. by another process.
    pub async fn resume(&self, project_id: &str) -> Result<JobOutcome, BuildError> {
        let project_id = valid_project_id(project_id)?;

        let outcome = JobOutcome::Building {
            project_id: project_id.to_owned(),
        };
        self.start_job(outcome.clone()).await;
        Ok(outcome)
    }

    /// Submits a new app description, superseding whatever job was tracked.
    ///
    /// A blank description is rejected before anything is sent. Transport
    /// failures never surface as errors: they become the connect failure
    /// [`JobOutcome::Error`].
    pub async fn submit(&self, description: &str) -> Result<JobOutcome, BuildError> {
        let request = BuildRequest::new(description)?;
        let generation = self.start_job(JobOutcome::None).await;

        let (outcome, app_type) = match self.backend_service.start_build(&request).await {
            Ok(project_response) => {
                let app_type = project_response.app_type().map(str::to_owned);
                match project_response.into_submitted_outcome() {
                    Ok(outcome) => (outcome, app_type),
                    Err(e) => {
                        warn!("Build submission returned an unusable response: {}", e);
                        (JobOutcome::connect_failure(), None)
                    }
                }
            }
            Err(e) => {
                warn!("Build submission failed: {}", e);
                (JobOutcome::connect_failure(), None)
            }
        };

        let mut tracked_job = self.tracked_job.lock().await;
        if tracked_job.generation != generation {
            debug!("Discarding submission result of superseded job: {}", outcome);
            return Ok(tracked_job.outcome.clone());
        }

        info!("Build submitted: {}", outcome);
        tracked_job.outcome = outcome.clone();
        tracked_job.app_type = app_type;
        Ok(outcome)
    }

    /// Queries the backend for the status of the tracked building job.
    ///
    /// Calling this for any job other than the one currently building is a
    /// no-op that returns the live outcome, as is calling it while another
    /// re-check of the same job is outstanding. A transport failure leaves
    /// the job building and is returned to the caller.
    pub async fn recheck_status(&self, project_id: &str) -> Result<JobOutcome, BuildError> {
        let generation = {
            let tracked_job = self.tracked_job.lock().await;
            if !tracked_job.outcome.is_building_job(project_id) {
                debug!(
                    "Ignoring status re-check for {}, tracked job is {}",
                    project_id, tracked_job.outcome
                );
                return Ok(tracked_job.outcome.clone());
            }
            tracked_job.generation
        };

        let _guard = match RecheckGuard::acquire(&self.recheck_in_flight, generation) {
            Some(guard) => guard,
            None => {
                debug!("Status re-check for {} already in flight", project_id);
                return Ok(self.current_outcome().await);
            }
        };

        let project_status = self.backend_service.get_project_status(project_id).await;

        let mut tracked_job = self.tracked_job.lock().await;
        if tracked_job.generation != generation {
            debug!("Discarding status of superseded job {}", project_id);
            return Ok(tracked_job.outcome.clone());
        }

        let project_response = match project_status {
            Ok(project_response) => project_response,
            Err(e) => {
                warn!("Status re-check for {} failed: {}", project_id, e);
                return Err(e);
            }
        };

        match project_response.project_status() {
            ProjectStatus::Completed => {
                let app_type = project_response
                    .app_type()
                    .map(str::to_owned)
                    .or_else(|| tracked_job.app_type.clone());
                tracked_job.outcome = JobOutcome::completed(
                    project_id.to_owned(),
                    app_type,
                    project_response.download.clone(),
                );
                info!("Build completed: {}", tracked_job.outcome);
            }
            ProjectStatus::Error => {
                tracked_job.outcome = JobOutcome::Error {
                    message: project_response.error_message(),
                };
                info!("Build failed: {}", tracked_job.outcome);
            }
            status => {
                debug!("Project {} still in progress ({:?})", project_id, status);
            }
        }

        Ok(tracked_job.outcome.clone())
    }

    /// Re-checks the tracked building job every `interval` until it leaves
    /// the building state, `max_attempts` re-checks were made, or another
    /// job replaces it. Transport failures are logged and polling goes on.
    pub async fn wait_for_completion(
        &self,
        interval: Duration,
        max_attempts: Option<usize>,
    ) -> JobOutcome {
        let (generation, project_id) = {
            let tracked_job = self.tracked_job.lock().await;
            match &tracked_job.outcome {
                JobOutcome::Building { project_id } => {
                    (tracked_job.generation, project_id.clone())
                }
                outcome => return outcome.clone(),
            }
        };

        let mut attempts = 0;
        loop {
            if max_attempts.map_or(false, |max| attempts >= max) {
                debug!("Giving up on {} after {} re-checks", project_id, attempts);
                return self.current_outcome().await;
            }

            tokio::time::sleep(interval).await;
            attempts += 1;

            if let Err(e) = self.recheck_status(&project_id).await {
                warn!("Re-check {} of {} failed: {}", attempts, project_id, e);
            }

            let tracked_job = self.tracked_job.lock().await;
            if tracked_job.generation != generation || !tracked_job.outcome.is_building() {
                return tracked_job.outcome.clone();
            }
        }
    }

    async fn start_job(&self, outcome: JobOutcome) -> u64 {
        let mut tracked_job = self.tracked_job.lock().await;
        tracked_job.generation += 1;
        tracked_job.outcome = outcome;
        tracked_job.app_type = None;
        tracked_job.generation
    }
}
