//! Reachability Probe
//!
//! Answers "can this helper reach that host?" with a timed TCP connect.
//! Targets may be URLs (`https://google.com`), `host:port`, `[v6]:port`,
//! bare addresses or bare hostnames.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tracing::{debug, info};
use url::{Host, Url};

use crate::discovery::DnsLookup;

/// Probe settings
#[derive(Debug, Clone, Copy)]
pub struct ProbeOptions {
    /// Connect timeout
    pub timeout: Duration,

    /// Port used when the target carries neither a port nor a known scheme
    pub default_port: u16,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            default_port: 80,
        }
    }
}

/// Host and port extracted from a probe target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    pub host: String,
    pub port: u16,
}

/// Outcome of one probe
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    /// Target as submitted
    pub target: String,
    pub host: String,
    pub port: u16,

    /// Address the connect was attempted against
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<SocketAddr>,

    pub reachable: bool,

    /// Connect round-trip in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rtt_ms: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    #[error("Empty probe target")]
    EmptyTarget,

    #[error("Invalid probe target '{0}': {1}")]
    InvalidTarget(String, String),
}

/// Parse a probe target into host and port
pub fn parse_target(target: &str, default_port: u16) -> Result<ProbeTarget, ProbeError> {
    let target = target.trim();
    if target.is_empty() {
        return Err(ProbeError::EmptyTarget);
    }

    let invalid = |reason: &str| ProbeError::InvalidTarget(target.to_string(), reason.to_string());

    if target.contains("://") {
        let url = Url::parse(target).map_err(|e| invalid(&e.to_string()))?;
        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(ip)) => ip.to_string(),
            Some(Host::Ipv6(ip)) => ip.to_string(),
            None => return Err(invalid("URL has no host")),
        };
        let port = url.port_or_known_default().unwrap_or(default_port);
        return Ok(ProbeTarget { host, port });
    }

    if let Ok(addr) = target.parse::<SocketAddr>() {
        return Ok(ProbeTarget {
            host: addr.ip().to_string(),
            port: addr.port(),
        });
    }

    if let Ok(ip) = target.trim_start_matches('[').trim_end_matches(']').parse::<IpAddr>() {
        return Ok(ProbeTarget {
            host: ip.to_string(),
            port: default_port,
        });
    }

    let (host, port) = match target.rsplit_once(':') {
        Some((host, port)) => {
            let port = port.parse::<u16>().map_err(|_| invalid("bad port"))?;
            (host, port)
        }
        None => (target, default_port),
    };

    if host.is_empty() || host.contains(|c: char| c.is_whitespace() || c == '/' || c == ':') {
        return Err(invalid("bad host"));
    }

    Ok(ProbeTarget {
        host: host.to_string(),
        port,
    })
}

/// Probe `target` with a TCP connect to its first resolved address.
///
/// Hostnames go through `dns`, the same resolver discovery uses, so names
/// under `.internal` resolve against the private network nameservers.
/// Resolution and connect failures are reported as `reachable: false`; only
/// an unusable target string is an error.
pub async fn probe(
    dns: &dyn DnsLookup,
    target: &str,
    options: ProbeOptions,
) -> Result<ProbeReport, ProbeError> {
    let parsed = parse_target(target, options.default_port)?;
    debug!("Probing {}:{}", parsed.host, parsed.port);

    let mut report = ProbeReport {
        target: target.trim().to_string(),
        host: parsed.host.clone(),
        port: parsed.port,
        address: None,
        reachable: false,
        rtt_ms: None,
        error: None,
        checked_at: Utc::now(),
    };

    let ip = match parsed.host.parse::<IpAddr>() {
        Ok(ip) => Some(ip),
        Err(_) => match dns.lookup_ip(&parsed.host).await {
            Ok(addrs) => addrs.into_iter().next(),
            Err(e) => {
                report.error = Some(format!("resolution failed: {e}"));
                return Ok(report);
            }
        },
    };

    let Some(ip) = ip else {
        report.error = Some("resolution returned no addresses".to_string());
        return Ok(report);
    };
    let address = SocketAddr::new(ip, parsed.port);
    report.address = Some(address);

    let start = Instant::now();
    match tokio::time::timeout(options.timeout, TcpStream::connect(address)).await {
        Ok(Ok(_stream)) => {
            report.reachable = true;
            report.rtt_ms = Some(start.elapsed().as_secs_f64() * 1000.0);
        }
        Ok(Err(e)) => {
            report.error = Some(format!("connect failed: {e}"));
        }
        Err(_) => {
            report.error = Some(format!("timed out after {}s", options.timeout.as_secs()));
        }
    }

    info!(
        "🏓 Probe {} ({}): reachable={}",
        report.target, address, report.reachable
    );

    Ok(report)
}
