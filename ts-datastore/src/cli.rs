//! Command-line interface of the `ts-datastore` binary.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use miniserde::json::{self, Value as JsonValue};

use crate::config::DatastoreConfig;
use crate::constants::{ACTIONS, ENV_CONFIG, ENV_DATABASE};
use crate::dispatch::call_action;
use crate::store::Datastore;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "ts-datastore")]
#[command(version, about = "Timeseries datastore with custom range filters", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// SQLite database path, overrides the config file
    #[arg(long, short = 'd', global = true, env = ENV_DATABASE)]
    pub database: Option<String>,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run an action with a JSON data dictionary and print the JSON result
    Action {
        /// Action name, e.g. datastore_ts_search
        name: String,
        /// JSON object, e.g. '{"resource_id": "r1", "filters": {"age_between": [25, 35]}}'
        data: String,
    },
    /// List the available actions
    Actions,
}

impl Cli {
    /// Configuration from the config file (if any) with flag overrides applied.
    pub fn load_config(&self) -> anyhow::Result<DatastoreConfig> {
        let config = match &self.config {
            Some(path) => DatastoreConfig::from_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => DatastoreConfig::default(),
        };
        Ok(match &self.database {
            Some(database) => config.with_database(database.clone()),
            None => config,
        })
    }

    /// Execute the command and return what should be printed.
    pub fn run(&self) -> anyhow::Result<String> {
        match &self.command {
            Commands::Actions => Ok(ACTIONS.join("\n")),
            Commands::Action { name, data } => {
                let data: JsonValue =
                    json::from_str(data).context("action data is not valid JSON")?;
                let config = self.load_config()?;
                let mut store = Datastore::open(config).context("opening datastore")?;
                let result = call_action(&mut store, name, &data)
                    .with_context(|| format!("action {name} failed"))?;
                Ok(json::to_string(&result))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("ts-datastore").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_list_actions() {
        let output = parse(&["actions"]).run().unwrap();
        assert_eq!(
            output,
            "datastore_ts_create\ndatastore_ts_search\ndatastore_ts_delete"
        );
    }

    #[test]
    fn test_database_flag_overrides_default() {
        let cli = parse(&["--database", "/tmp/ts.db", "actions"]);
        assert_eq!(cli.load_config().unwrap().database, "/tmp/ts.db");
    }

    #[test]
    fn test_action_runs_against_memory_database() {
        let cli = parse(&[
            "action",
            "datastore_ts_create",
            r#"{"resource_id": "r1", "records": [{"age": 30}]}"#,
        ]);
        let output = cli.run().unwrap();
        assert!(output.contains(r#""records_inserted":1"#), "{output}");
    }

    #[test]
    fn test_invalid_json_data() {
        let cli = parse(&["action", "datastore_ts_search", "{not json"]);
        let err = cli.run().unwrap_err();
        assert!(err.to_string().contains("not valid JSON"));
    }

    #[test]
    fn test_missing_resource_is_reported() {
        let cli = parse(&[
            "action",
            "datastore_ts_search",
            r#"{"resource_id": "r1", "filters": {"insecure_filter": 1}}"#,
        ]);
        let err = cli.run().unwrap_err();
        assert!(format!("{err:#}").contains("Resource 'r1' not found"), "{err:#}");
    }
}
