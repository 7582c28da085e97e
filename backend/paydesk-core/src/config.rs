// src/config.rs

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::AppError;

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    5000
}

fn default_admin() -> String {
    "admin".to_string()
}

fn default_session_ttl_hours() -> u64 {
    12
}

fn default_cors_origin() -> String {
    "http://localhost:5173".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    // Server
    #[serde(default = "default_server_host")]
    pub server_host: String,
    #[serde(default = "default_server_port")]
    pub server_port: u16,
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
    pub cert_path: Option<PathBuf>,
    pub key_path: Option<PathBuf>,

    // Admin account
    #[serde(default = "default_admin")]
    pub admin_username: String,
    #[serde(default = "default_admin")]
    pub admin_password: String,
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: u64,

    // Storage
    pub data_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: default_server_host(),
            server_port: default_server_port(),
            cors_origin: default_cors_origin(),
            cert_path: None,
            key_path: None,
            admin_username: default_admin(),
            admin_password: default_admin(),
            session_ttl_hours: default_session_ttl_hours(),
            data_file: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, envy::Error> {
        // Load .env file if it exists
        dotenv::dotenv().ok();
        envy::from_env::<Config>()
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.server_host, self.server_port)
            .parse()
            .map_err(|e| {
                AppError::Config(format!(
                    "Invalid server address {}:{}: {}",
                    self.server_host, self.server_port, e
                ))
            })
    }

    /// Certificate and key paths when both are configured.
    pub fn tls_paths(&self) -> Option<(PathBuf, PathBuf)> {
        match (&self.cert_path, &self.key_path) {
            (Some(cert), Some(key)) => Some((cert.clone(), key.clone())),
            _ => None,
        }
    }

    pub fn uses_default_credentials(&self) -> bool {
        self.admin_username == default_admin() && self.admin_password == default_admin()
    }
}
