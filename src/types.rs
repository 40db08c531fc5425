//! Core types for private network discovery
//!
//! These types define the JSON document returned by `/apps`. The shape is
//! consumed by existing tooling, so field names and nesting are fixed:
//!
//! ```text
//! [
//!   { "allapps": ["app1", "app2"] },
//!   { "app1": {
//!       "appregions": ["us", "eu"],
//!       "appinstances": ["fdaa::1"],
//!       "regioninstances": [ { "us": ["fdaa::1"] }, { "eu": { "error": {..} } } ]
//!   } }
//! ]
//! ```

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::fmt;
use std::net::Ipv6Addr;

// =============================================================================
// PRIMITIVE TYPES
// =============================================================================

/// Logical application name (a DNS label)
pub type AppName = String;

/// Deployment region code
pub type RegionCode = String;

/// One running instance, addressed by its private IPv6 address
pub type Instance = Ipv6Addr;

// =============================================================================
// LOOKUP FAILURES
// =============================================================================

/// DNS record type queried by discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecordKind {
    #[serde(rename = "TXT")]
    Txt,
    #[serde(rename = "AAAA")]
    Aaaa,
    /// A and AAAA, as used for probe targets
    #[serde(rename = "A/AAAA")]
    Address,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Txt => write!(f, "TXT"),
            RecordKind::Aaaa => write!(f, "AAAA"),
            RecordKind::Address => write!(f, "A/AAAA"),
        }
    }
}

/// Why a lookup failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// NXDOMAIN or no records of the requested type
    NotFound,
    /// Resolver gave up waiting for an answer
    Timeout,
    /// Answer arrived but does not follow the record convention
    Malformed,
    /// Anything else the resolver reported
    Other,
}

/// A DNS query that failed or returned unparseable data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{record_type} lookup for {query} failed ({kind:?}): {message}")]
pub struct LookupFailure {
    /// Fully formed name that was queried
    pub query: String,

    /// Record type that was queried
    pub record_type: RecordKind,

    /// Failure classification
    pub kind: FailureKind,

    /// Underlying cause as reported by the resolver
    pub message: String,
}

impl LookupFailure {
    pub fn new(
        query: impl Into<String>,
        record_type: RecordKind,
        kind: FailureKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            query: query.into(),
            record_type,
            kind,
            message: message.into(),
        }
    }

    /// TXT answer that does not carry a usable first string
    pub fn malformed(query: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(query, RecordKind::Txt, FailureKind::Malformed, message)
    }
}

/// Result of a lookup whose failure is reported inline instead of aborting
///
/// Serializes as the resolved value itself, or as `{"error": <failure>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum LookupOutcome<T> {
    Resolved(T),
    Failed { error: LookupFailure },
}

impl<T> LookupOutcome<T> {
    pub fn is_failed(&self) -> bool {
        matches!(self, LookupOutcome::Failed { .. })
    }
}

impl<T> From<Result<T, LookupFailure>> for LookupOutcome<T> {
    fn from(result: Result<T, LookupFailure>) -> Self {
        match result {
            Ok(value) => LookupOutcome::Resolved(value),
            Err(error) => LookupOutcome::Failed { error },
        }
    }
}

// =============================================================================
// DISCOVERY RESULT
// =============================================================================

/// Instances of one app in one region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionInstances {
    pub region: RegionCode,
    pub instances: LookupOutcome<Vec<Instance>>,
}

impl Serialize for RegionInstances {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.region, &self.instances)?;
        map.end()
    }
}

/// Topology of one app whose region list resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppTopology {
    #[serde(rename = "appregions")]
    pub regions: Vec<RegionCode>,

    #[serde(rename = "appinstances")]
    pub instances: LookupOutcome<Vec<Instance>>,

    #[serde(rename = "regioninstances")]
    pub region_instances: Vec<RegionInstances>,
}

impl AppTopology {
    /// Number of inline failure markers in this entry
    pub fn failure_count(&self) -> usize {
        let global = usize::from(self.instances.is_failed());
        let regional = self
            .region_instances
            .iter()
            .filter(|r| r.instances.is_failed())
            .count();
        global + regional
    }
}

/// One element of the discovery document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryEntry {
    /// Every app named in `_apps.internal`
    AllApps(Vec<AppName>),

    /// Topology of a single app
    App { name: AppName, topology: AppTopology },
}

impl Serialize for DiscoveryEntry {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            DiscoveryEntry::AllApps(apps) => map.serialize_entry("allapps", apps)?,
            DiscoveryEntry::App { name, topology } => map.serialize_entry(name, topology)?,
        }
        map.end()
    }
}

/// Ordered discovery document: the app list first, then one entry per app
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DiscoveryResult {
    entries: Vec<DiscoveryEntry>,
}

impl DiscoveryResult {
    pub fn new(apps: Vec<AppName>) -> Self {
        Self {
            entries: vec![DiscoveryEntry::AllApps(apps)],
        }
    }

    pub fn push_app(&mut self, name: AppName, topology: AppTopology) {
        self.entries.push(DiscoveryEntry::App { name, topology });
    }

    #[cfg(test)]
    pub fn entries(&self) -> &[DiscoveryEntry] {
        &self.entries
    }

    /// Apps listed in the first entry
    pub fn all_apps(&self) -> &[AppName] {
        match self.entries.first() {
            Some(DiscoveryEntry::AllApps(apps)) => apps,
            _ => &[],
        }
    }

    /// Topology entry for `app`, if its regions resolved
    #[cfg(test)]
    pub fn app(&self, app: &str) -> Option<&AppTopology> {
        self.entries.iter().find_map(|entry| match entry {
            DiscoveryEntry::App { name, topology } if name == app => Some(topology),
            _ => None,
        })
    }

    /// Number of per-app entries
    pub fn app_entry_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, DiscoveryEntry::App { .. }))
            .count()
    }

    /// Inline failure markers across all app entries
    pub fn failure_count(&self) -> usize {
        self.entries
            .iter()
            .map(|entry| match entry {
                DiscoveryEntry::App { topology, .. } => topology.failure_count(),
                DiscoveryEntry::AllApps(_) => 0,
            })
            .sum()
    }
}
