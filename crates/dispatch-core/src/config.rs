//! Dispatcher configuration parser.
//!
//! Configuration is read from a TOML file, or from JSON when the file
//! extension is `.json`. Every field is optional and falls back to a
//! built-in default.

use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

pub const DEFAULT_INTER_ADDR: &str = "0.0.0.0:12170";
pub const DEFAULT_OUTER_ADDR: &str = "0.0.0.0:12171";
pub const DEFAULT_WORKER_CAPACITY: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Bind address facing worker servers.
    pub inter_addr: String,
    /// Bind address facing clients.
    pub outer_addr: String,
    /// Worker source IPs permitted to register.
    pub allow_list: Vec<String>,
    /// Client source IPs refused on the outer port.
    pub deny_list: Vec<String>,
    /// Registry page capacity. Sized to the expected worker count to keep
    /// allocations rare; the registry still grows past it.
    pub worker_capacity: usize,
    /// Worker idle timeout in seconds (min 1). Sessions use twice this as
    /// their read deadline.
    pub timeout_secs: u64,
    /// Seconds between live → dispatch reconciliation ticks.
    pub sync_interval_secs: u64,
    /// Capacity of the handoff channel between scheduler and clients.
    pub handoff_capacity: usize,
    /// How long a client waits for a worker before getting the empty reply.
    pub handoff_wait_ms: u64,
    /// Default tracing directive when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            inter_addr: DEFAULT_INTER_ADDR.to_string(),
            outer_addr: DEFAULT_OUTER_ADDR.to_string(),
            allow_list: Vec::new(),
            deny_list: Vec::new(),
            worker_capacity: DEFAULT_WORKER_CAPACITY,
            timeout_secs: 30,
            sync_interval_secs: 1,
            handoff_capacity: 100,
            handoff_wait_ms: 1000,
            log_level: "info".to_string(),
        }
    }
}

impl DispatcherConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let config: DispatcherConfig = if is_json {
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
        } else {
            toml::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
        };

        config.validate()?;
        Ok(config)
    }

    /// Check that bind addresses and access-list entries parse.
    pub fn validate(&self) -> ConfigResult<()> {
        self.inter_socket_addr()?;
        self.outer_socket_addr()?;
        parse_ips("allow_list", &self.allow_list)?;
        parse_ips("deny_list", &self.deny_list)?;
        Ok(())
    }

    pub fn inter_socket_addr(&self) -> ConfigResult<SocketAddr> {
        parse_socket_addr("inter_addr", &self.inter_addr)
    }

    pub fn outer_socket_addr(&self) -> ConfigResult<SocketAddr> {
        parse_socket_addr("outer_addr", &self.outer_addr)
    }

    pub fn allowed_ips(&self) -> ConfigResult<Vec<IpAddr>> {
        parse_ips("allow_list", &self.allow_list)
    }

    pub fn denied_ips(&self) -> ConfigResult<Vec<IpAddr>> {
        parse_ips("deny_list", &self.deny_list)
    }

    pub fn page_capacity(&self) -> usize {
        self.worker_capacity.max(1)
    }

    /// Rolling read deadline for worker sessions.
    pub fn read_deadline(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1).saturating_mul(2))
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs.max(1))
    }

    pub fn channel_capacity(&self) -> usize {
        self.handoff_capacity.max(1)
    }

    pub fn handoff_wait(&self) -> Duration {
        Duration::from_millis(self.handoff_wait_ms)
    }
}

/// Accepts `host:port`, or the `:port` shorthand meaning all interfaces.
fn parse_socket_addr(field: &'static str, value: &str) -> ConfigResult<SocketAddr> {
    let candidate = if value.starts_with(':') {
        format!("0.0.0.0{value}")
    } else {
        value.to_string()
    };
    candidate.parse().map_err(|_| ConfigError::InvalidAddress {
        field,
        value: value.to_string(),
    })
}

fn parse_ips(field: &'static str, values: &[String]) -> ConfigResult<Vec<IpAddr>> {
    values
        .iter()
        .map(|v| {
            v.trim().parse().map_err(|_| ConfigError::InvalidAddress {
                field,
                value: v.clone(),
            })
        })
        .collect()
}
