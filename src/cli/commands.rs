//! CLI command implementations

use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::datastore::MemoryDatastore;
use crate::query;
use crate::server::{QueryServer, ServiceConfig};

use super::args::Command;
use super::errors::{CliError, CliErrorCode, CliResult};

/// Dispatches a parsed command.
pub fn run_command(command: Command) -> CliResult<()> {
    match command {
        Command::Serve {
            config,
            host,
            port,
            max_bbox_area,
            fixture,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(max_bbox_area) = max_bbox_area {
                config.max_bbox_area = max_bbox_area;
            }
            if let Some(fixture) = fixture {
                config.fixture = Some(fixture);
            }
            serve(config)
        }
        Command::Check { query } => check(&query),
    }
}

/// Loads the configuration file, or defaults when none is given.
fn load_config(path: Option<&Path>) -> CliResult<ServiceConfig> {
    match path {
        None => Ok(ServiceConfig::default()),
        Some(path) => {
            let text = fs::read_to_string(path).map_err(|err| {
                CliError::new(
                    CliErrorCode::ConfigError,
                    format!("cannot read {}: {}", path.display(), err),
                )
            })?;
            serde_json::from_str(&text).map_err(|err| {
                CliError::new(
                    CliErrorCode::ConfigError,
                    format!("cannot parse {}: {}", path.display(), err),
                )
            })
        }
    }
}

/// Boots the datastore and serves until stopped.
fn serve(config: ServiceConfig) -> CliResult<()> {
    let datastore = match &config.fixture {
        Some(path) => MemoryDatastore::from_fixture_file(path).map_err(|err| {
            CliError::new(
                CliErrorCode::FixtureError,
                format!("cannot load {}: {}", path.display(), err),
            )
        })?,
        None => MemoryDatastore::new(),
    };

    let server = QueryServer::new(config, Arc::new(datastore));

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|err| CliError::new(CliErrorCode::BootFailed, err.to_string()))?;
    runtime
        .block_on(server.start())
        .map_err(|err| CliError::new(CliErrorCode::BootFailed, err.to_string()))
}

/// One-shot parse check; prints the parsed shape or the parse error.
fn check(query_text: &str) -> CliResult<()> {
    match query::parse(query_text) {
        Ok(descriptor) => {
            println!(
                "ok: kind={} selectors={} bbox_area={}",
                descriptor.kind(),
                descriptor.selector_count(),
                descriptor.total_bbox_area()
            );
            Ok(())
        }
        Err(err) => Err(CliError::new(CliErrorCode::QueryError, err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config_defaults_without_path() {
        let config = load_config(None).unwrap();
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_load_config_missing_file_is_config_error() {
        let err = load_config(Some(Path::new("/nonexistent/geoserve.json"))).unwrap_err();
        assert_eq!(err.code(), CliErrorCode::ConfigError);
    }

    #[test]
    fn test_check_rejects_bad_query() {
        let err = check("planet[amenity=pub]").unwrap_err();
        assert_eq!(err.code(), CliErrorCode::QueryError);
    }

    #[test]
    fn test_check_accepts_valid_query() {
        assert!(check("node[amenity=pub]").is_ok());
    }
}
