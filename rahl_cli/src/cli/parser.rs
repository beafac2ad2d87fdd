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

use clap::{arg, command, value_parser, ArgMatches, Command};

pub const DEFAULT_POLL_INTERVAL_SECS: &str = "5";

pub fn cli_command() -> Command {
    command!()
        .arg_required_else_help(true)
        .propagate_version(false)
        .arg(
            arg!(--"api-url" <URL> "Base URL of the build backend (e.g. http://localhost:5000)")
                .required(false)
                .global(true),
        )
        .subcommands(vec![
            Command::new("build")
                .short_flag('b')
                .about("Describe an app and request an APK build")
                .arg_required_else_help(true)
                .args(&[
                    arg!(<DESCRIPTION> "What the app should do (e.g. \"Create a calculator app with dark mode and history feature\")"),
                    arg!(-w --wait "Keep checking the build status until the APK is ready"),
                    arg!(-i --interval <SECS> "Seconds between status checks while waiting")
                        .required(false)
                        .value_parser(value_parser!(u64).range(1..))
                        .default_value(DEFAULT_POLL_INTERVAL_SECS),
                ]),
            Command::new("status")
                .short_flag('s')
                .about("Checks the build status of a project")
                .arg_required_else_help(true)
                .args(&[arg!(<PROJECT_ID> "The project ID returned by the build command")]),
            Command::new("download")
                .short_flag('d')
                .about("Downloads the APK of a completed project")
                .arg_required_else_help(true)
                .args(&[
                    arg!(<PROJECT_ID> "The project ID returned by the build command"),
                    arg!(-o --output <FILE> "Where to write the APK (defaults to <PROJECT_ID>.apk)")
                        .required(false),
                ]),
            Command::new("config")
                .short_flag('c')
                .about("Rahl CLI config commands")
                .arg_required_else_help(true)
                .args(&[
                    arg!(-e --edit <URL> "Stores the base URL of the build backend").required(false),
                    arg!(-r --remove   "Removes the stored CLI configuration").visible_alias("rm"),
                    arg!(-s --show     "Shows the stored CLI configuration"),
                ]),
        ])
}

pub fn cli_parser() -> ArgMatches {
    cli_command().get_matches()
}
