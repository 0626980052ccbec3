//! Environment-backed configuration.

use serde::Deserialize;

use crate::hvw::DEFAULT_BASE_URL;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    /// HVW endpoint; the default points at the public service.
    #[serde(default = "default_hvw_base_url")]
    pub hvw_base_url: String,
    /// HVW organization selector (`og` query parameter).
    #[serde(default = "default_hvw_organization")]
    pub hvw_organization: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Serialize overlapping cache runs of the same type. Off by default:
    /// overlapping runs both write, last-writer-wins at the record level.
    #[serde(default)]
    pub serialize_runs: bool,
}

fn default_hvw_base_url() -> String {
    DEFAULT_BASE_URL.to_owned()
}

fn default_hvw_organization() -> String {
    // Handballverband Württemberg.
    "3".to_owned()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_owned()
}
