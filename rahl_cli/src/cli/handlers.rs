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

use anyhow::{anyhow, Result};
use rahl::build_service::error::BuildError;
use rahl::build_service::model::JobOutcome;
use rahl::build_service::service::BuildService;
use rahl::cli_commands::{build, config};
use std::path::Path;
use std::time::Duration;

pub fn config_edit(api_url: &str) -> Result<()> {
    config::config_edit(Some(api_url.to_owned()))?;
    println!("CLI configuration saved !!");
    Ok(())
}

pub fn config_remove() -> Result<()> {
    config::config_remove()?;
    println!("CLI configuration removed !!");
    Ok(())
}

pub fn config_show() -> Result<()> {
    let config = config::get_config()?;
    print!("{}", config);
    Ok(())
}

pub async fn request_build(
    api_url: Option<&str>,
    description: &str,
    wait: bool,
    interval: u64,
) -> Result<()> {
    let build_service = build::build_service(api_url)?;

    let outcome = match build_service.submit(description).await {
        Ok(outcome) => outcome,
        Err(BuildError::EmptyDescription) => {
            return Err(anyhow!("Please describe the app you want to build."))
        }
        Err(error) => return Err(error.into()),
    };

    let outcome = match outcome {
        JobOutcome::Building { project_id } if wait => {
            println!(
                "Build with ID {} has been started. Waiting for it to complete...",
                project_id
            );
            build_service
                .wait_for_completion(Duration::from_secs(interval), None)
                .await
        }
        outcome => outcome,
    };

    handle_outcome(&build_service, outcome).await
}

pub async fn request_status(api_url: Option<&str>, project_id: &str) -> Result<()> {
    let build_service = build::build_service(api_url)?;
    build_service.resume(project_id).await?;

    let outcome = build_service.recheck_status(project_id).await?;
    handle_outcome(&build_service, outcome).await
}

pub async fn download(api_url: Option<&str>, project_id: &str, output: Option<&Path>) -> Result<()> {
    let written = build::download_apk(api_url, project_id, output).await?;
    println!("APK saved to {}", written.display());
    Ok(())
}

async fn handle_outcome(build_service: &BuildService, outcome: JobOutcome) -> Result<()> {
    match outcome {
        JobOutcome::None => Ok(()),
        JobOutcome::Error { message } => Err(anyhow!(message)),
        JobOutcome::Building { project_id } => {
            println!(
                "Build with ID {} is in progress. Check again with: rahl status {}",
                project_id, project_id
            );
            Ok(())
        }
        JobOutcome::Completed {
            project_id,
            app_type,
            ..
        } => {
            println!("Your APK is ready!");
            println!("App Type:       {}", app_type);
            println!("Project ID:     {}", project_id);
            if let Some(download_url) = build_service.download_url().await {
                println!("Download:       {}", download_url);
            }
            Ok(())
        }
    }
}
