//! DNS Lookup Backend
//!
//! `DnsLookup` is the only thing discovery needs from DNS. Production uses
//! `HickoryLookup`; tests swap in a map-backed fake.

use async_trait::async_trait;
use hickory_resolver::config::{NameServerConfig, ResolverConfig};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::proto::xfer::Protocol;
use hickory_resolver::proto::ProtoErrorKind;
use hickory_resolver::{ResolveError, ResolveErrorKind, Resolver, TokioResolver};
use std::net::{IpAddr, Ipv6Addr};
use tracing::debug;

use crate::config::HelperConfig;
use crate::types::{FailureKind, LookupFailure, RecordKind};

/// Raw TXT and AAAA queries
#[async_trait]
pub trait DnsLookup: Send + Sync {
    /// All TXT records at `name`, each as its list of character strings
    async fn lookup_txt(&self, name: &str) -> Result<Vec<Vec<String>>, LookupFailure>;

    /// All AAAA records at `name`, in resolver order
    async fn lookup_aaaa(&self, name: &str) -> Result<Vec<Ipv6Addr>, LookupFailure>;

    /// A and AAAA addresses of a host, for reaching it directly
    async fn lookup_ip(&self, host: &str) -> Result<Vec<IpAddr>, LookupFailure>;
}

/// `DnsLookup` backed by hickory's tokio resolver
pub struct HickoryLookup {
    resolver: TokioResolver,
}

impl HickoryLookup {
    /// Build a resolver from the helper configuration.
    ///
    /// With no nameservers configured the system configuration is read.
    pub fn from_config(config: &HelperConfig) -> anyhow::Result<Self> {
        let nameservers = config.nameserver_addrs()?;

        let mut builder = if nameservers.is_empty() {
            TokioResolver::builder_tokio()
                .map_err(|e| anyhow::anyhow!("failed to read system resolver config: {e}"))?
        } else {
            let name_servers: Vec<NameServerConfig> = nameservers
                .iter()
                .flat_map(|addr| {
                    [
                        NameServerConfig::new(*addr, Protocol::Udp),
                        NameServerConfig::new(*addr, Protocol::Tcp),
                    ]
                })
                .collect();
            let resolver_config = ResolverConfig::from_parts(None, vec![], name_servers);
            Resolver::builder_with_config(resolver_config, TokioConnectionProvider::default())
        };

        let opts = builder.options_mut();
        opts.timeout = config.dns_timeout();
        opts.attempts = config.dns_attempts;
        // Every request sees fresh records
        opts.cache_size = 0;

        debug!(
            nameservers = nameservers.len(),
            timeout_secs = config.dns_timeout_secs,
            "Created discovery resolver"
        );

        Ok(Self {
            resolver: builder.build(),
        })
    }
}

#[async_trait]
impl DnsLookup for HickoryLookup {
    async fn lookup_txt(&self, name: &str) -> Result<Vec<Vec<String>>, LookupFailure> {
        let lookup = self
            .resolver
            .txt_lookup(name)
            .await
            .map_err(|e| resolve_failure(name, RecordKind::Txt, &e))?;

        lookup
            .iter()
            .map(|txt| {
                txt.iter()
                    .map(|data| {
                        String::from_utf8(data.to_vec()).map_err(|e| {
                            LookupFailure::malformed(name, format!("TXT string is not UTF-8: {e}"))
                        })
                    })
                    .collect()
            })
            .collect()
    }

    async fn lookup_aaaa(&self, name: &str) -> Result<Vec<Ipv6Addr>, LookupFailure> {
        let lookup = self
            .resolver
            .ipv6_lookup(name)
            .await
            .map_err(|e| resolve_failure(name, RecordKind::Aaaa, &e))?;

        Ok(lookup.iter().map(|aaaa| aaaa.0).collect())
    }

    async fn lookup_ip(&self, host: &str) -> Result<Vec<IpAddr>, LookupFailure> {
        let lookup = self
            .resolver
            .lookup_ip(host)
            .await
            .map_err(|e| resolve_failure(host, RecordKind::Address, &e))?;

        Ok(lookup.iter().collect())
    }
}

fn resolve_failure(name: &str, record_type: RecordKind, err: &ResolveError) -> LookupFailure {
    LookupFailure::new(name, record_type, classify(err), err.to_string())
}

fn classify(err: &ResolveError) -> FailureKind {
    if err.is_nx_domain() || err.is_no_records_found() {
        return FailureKind::NotFound;
    }
    match err.kind() {
        ResolveErrorKind::Proto(proto) if matches!(proto.kind(), ProtoErrorKind::Timeout) => {
            FailureKind::Timeout
        }
        _ => FailureKind::Other,
    }
}
