//! Server Configuration
//!
//! Configuration for the query server including bind address, CORS
//! settings, and the execution policy knobs.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Query server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Host to bind to (default: "0.0.0.0")
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to (default: 8080)
    #[serde(default = "default_port")]
    pub port: u16,

    /// CORS allowed origins (default: empty, meaning permissive)
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Maximum total bounding-box area, in square degrees
    #[serde(default = "default_max_bbox_area")]
    pub max_bbox_area: f64,

    /// Optional JSON fixture file to preload into the datastore
    #[serde(default)]
    pub fixture: Option<PathBuf>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_bbox_area() -> f64 {
    100.0
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            max_bbox_area: default_max_bbox_area(),
            fixture: None,
        }
    }
}

impl ServiceConfig {
    /// Create a new config with the specified port
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
