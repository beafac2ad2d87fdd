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

pub mod cli;

use cli::handlers::*;
use cli::parser::*;
use log::debug;
use std::path::Path;

#[tokio::main]
async fn main() {
    pretty_env_logger::init();

    // parsing command line arguments
    let matches = cli_parser();

    let result = match matches.subcommand() {
        Some(("build", build_matches)) => {
            let api_url = build_matches.get_one::<String>("api-url");
            let description = build_matches
                .get_one::<String>("DESCRIPTION")
                .map(String::as_str)
                .unwrap_or_default();
            let interval = build_matches
                .get_one::<u64>("interval")
                .copied()
                .unwrap_or(5);
            request_build(
                api_url.map(String::as_str),
                description,
                build_matches.get_flag("wait"),
                interval,
            )
            .await
        }
        Some(("status", status_matches)) => {
            let api_url = status_matches.get_one::<String>("api-url");
            let project_id = status_matches
                .get_one::<String>("PROJECT_ID")
                .map(String::as_str)
                .unwrap_or_default();
            request_status(api_url.map(String::as_str), project_id).await
        }
        Some(("download", download_matches)) => {
            let api_url = download_matches.get_one::<String>("api-url");
            let project_id = download_matches
                .get_one::<String>("PROJECT_ID")
                .map(String::as_str)
                .unwrap_or_default();
            let output = download_matches.get_one::<String>("output").map(Path::new);
            download(api_url.map(String::as_str), project_id, output).await
        }
        Some(("config", config_matches)) => {
            if let Some(api_url) = config_matches.get_one::<String>("edit") {
                config_edit(api_url)
            } else if config_matches.get_flag("remove") {
                config_remove()
            } else if config_matches.get_flag("show") {
                config_show()
            } else {
                Ok(())
            }
        }
        _ => {
            debug!("No subcommand given");
            Ok(())
        }
    };

    if let Err(error) = result {
        println!("Error: {}", error);
        std::process::exit(1);
    }
}
