//! Helper Configuration
//!
//! Configurable parameters for the private network helper.
//! Defaults match the conventional deployment: port 8888 on all interfaces,
//! system resolver configuration (which points at the private network DNS).

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;

/// Main configuration for the helper service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HelperConfig {
    // === HTTP ===

    /// Address the HTTP API binds to
    pub bind_addr: String,

    /// Port for the HTTP API
    pub api_port: u16,

    // === DNS ===

    /// Nameservers to query (`ip:port`).
    /// Empty means the system resolver configuration is used.
    pub nameservers: Vec<String>,

    /// Per-query resolver timeout (seconds)
    pub dns_timeout_secs: u64,

    /// Resolver attempts per nameserver before giving up
    pub dns_attempts: usize,

    // === Probe ===

    /// Connect timeout for reachability probes (seconds)
    pub ping_timeout_secs: u64,

    /// Port probed when the target names none and has no known scheme
    pub ping_default_port: u16,
}

impl Default for HelperConfig {
    fn default() -> Self {
        Self {
            // HTTP
            bind_addr: "::".to_string(),
            api_port: 8888,

            // DNS - system resolv.conf
            nameservers: vec![],
            dns_timeout_secs: 5,
            dns_attempts: 2,

            // Probe
            ping_timeout_secs: 5,
            ping_default_port: 80,
        }
    }
}

impl HelperConfig {
    /// Load configuration from TOML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    // Builder-style methods for CLI overrides

    pub fn with_api_port(mut self, port: Option<u16>) -> Self {
        if let Some(port) = port {
            self.api_port = port;
        }
        self
    }

    pub fn with_bind_addr(mut self, addr: Option<String>) -> Self {
        if let Some(addr) = addr {
            self.bind_addr = addr;
        }
        self
    }

    pub fn with_nameservers(mut self, nameservers: Vec<String>) -> Self {
        if !nameservers.is_empty() {
            self.nameservers = nameservers;
        }
        self
    }

    /// Socket address for the HTTP listener
    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        let ip: IpAddr = self.bind_addr.parse().map_err(|e| {
            anyhow::anyhow!("invalid bind_addr '{}': {}", self.bind_addr, e)
        })?;
        Ok(SocketAddr::new(ip, self.api_port))
    }

    /// Parsed nameserver addresses
    pub fn nameserver_addrs(&self) -> anyhow::Result<Vec<SocketAddr>> {
        self.nameservers
            .iter()
            .map(|ns| {
                ns.parse::<SocketAddr>()
                    .map_err(|e| anyhow::anyhow!("invalid nameserver '{}': {}", ns, e))
            })
            .collect()
    }

    pub fn dns_timeout(&self) -> Duration {
        Duration::from_secs(self.dns_timeout_secs)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_secs(self.ping_timeout_secs)
    }

    /// Validate configuration values
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_port == 0 {
            anyhow::bail!("api_port must not be 0");
        }

        if self.dns_timeout_secs == 0 {
            anyhow::bail!("dns_timeout_secs must be greater than 0");
        }

        if self.dns_attempts == 0 {
            anyhow::bail!("dns_attempts must be at least 1");
        }

        if self.ping_timeout_secs == 0 {
            anyhow::bail!("ping_timeout_secs must be greater than 0");
        }

        if self.ping_default_port == 0 {
            anyhow::bail!("ping_default_port must not be 0");
        }

        self.listen_addr()?;
        self.nameserver_addrs()?;

        Ok(())
    }
}
