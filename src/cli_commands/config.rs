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

use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::util::env_util::read_var;

const CONF_FILE: &str = "rahl-cli";

/// Base URL of the build backend during local development.
pub const DEFAULT_API_URL: &str = "http://localhost:5000";

/// The name of the environment variable that overrides the location of the
/// configuration file. Tests point it at a temporary directory.
pub const RAHL_CLI_CONFIG: &str = "RAHL_CLI_CONFIG";

/// Gets the path of the configuration file. We always use [`confy::load_path`] and
/// [`confy::store_path`] (instead of [`confy::load`] and [`confy::store`] respectively)
/// so that [`RAHL_CLI_CONFIG`] can move the file somewhere else.
fn get_config_path() -> Result<PathBuf, confy::ConfyError> {
    match read_var(RAHL_CLI_CONFIG) {
        Some(config_path) => Ok(PathBuf::from(config_path)),
        None => confy::get_configuration_file_path(CONF_FILE, None),
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct CliConfig {
    pub api_url: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        CliConfig {
            api_url: DEFAULT_API_URL.to_string(),
        }
    }
}

impl Display for CliConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let config_toml = toml::to_string_pretty(&self).map_err(|_| std::fmt::Error)?;
        write!(f, "{}", config_toml)
    }
}

pub fn add_config(new_cfg: CliConfig) -> Result<()> {
    let config_path = get_config_path()?;

    let mut cfg: CliConfig = confy::load_path(&config_path)?;
    if !new_cfg.api_url.is_empty() {
        cfg.api_url = new_cfg.api_url
    }

    confy::store_path(&config_path, &cfg)?;

    Ok(())
}

pub fn config_remove() -> Result<()> {
    let cfg_path = get_config_path()?;
    if cfg_path.exists() {
        std::fs::remove_file(cfg_path)?;
    }
    Ok(())
}

pub fn config_edit(api_url: Option<String>) -> Result<()> {
    let mut cli_config = get_config()?;

    if let Some(validation_result) = api_url.map(valid_api_url) {
        match validation_result {
            Ok(api_url) => cli_config.api_url = api_url,
            Err(description) => return Err(anyhow!(description)),
        }
    }

    add_config(cli_config)
}

/// Accepts absolute http(s) URLs and drops any trailing slash.
pub fn valid_api_url(input: String) -> Result<String, String> {
    match Url::parse(input.trim()) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {
            Ok(input.trim().trim_end_matches('/').to_owned())
        }
        _ => Err(format!("Invalid value for API URL: {}", input)),
    }
}

pub fn get_config() -> Result<CliConfig> {
    let config_path = get_config_path()?;

    let cfg: CliConfig = confy::load_path(config_path)?;

    Ok(cfg)
}

pub fn get_config_file_path() -> Result<PathBuf> {
    get_config_path().map_err(|e| e.into())
}
