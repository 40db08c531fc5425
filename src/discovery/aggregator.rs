//! Discovery Aggregator
//!
//! Walks the `.internal` naming convention and assembles a `DiscoveryResult`.
//! The app list is fetched first; everything after it fans out concurrently.
//!
//! Failure policy:
//! - app list lookup fails: the whole aggregation fails
//! - an app's region lookup fails: that app is left out
//! - an instance lookup fails: the failure is rendered in place of the list

use futures_util::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

use super::names;
use super::resolver::DnsLookup;
use crate::types::{
    AppName, AppTopology, DiscoveryResult, Instance, LookupFailure, LookupOutcome, RegionCode,
    RegionInstances,
};

/// Stateless discovery over an injected DNS backend
#[derive(Clone)]
pub struct DiscoveryAggregator {
    dns: Arc<dyn DnsLookup>,
}

impl DiscoveryAggregator {
    pub fn new(dns: Arc<dyn DnsLookup>) -> Self {
        Self { dns }
    }

    /// Apps named in `_apps.internal`
    pub async fn list_apps(&self) -> Result<Vec<AppName>, LookupFailure> {
        self.txt_list(names::APPS_NAME).await
    }

    /// Regions named in `regions.<app>.internal`
    pub async fn list_regions(&self, app: &str) -> Result<Vec<RegionCode>, LookupFailure> {
        self.txt_list(&names::regions_name(app)).await
    }

    /// Instances at `<region>.<app>.internal`, in resolver order
    pub async fn list_instances_in_region(
        &self,
        region: &str,
        app: &str,
    ) -> Result<Vec<Instance>, LookupFailure> {
        self.aaaa_list(&names::region_instances_name(region, app)).await
    }

    /// Instances at `global.<app>.internal`, in resolver order
    pub async fn list_all_instances(&self, app: &str) -> Result<Vec<Instance>, LookupFailure> {
        self.aaaa_list(&names::global_instances_name(app)).await
    }

    /// Build the full discovery document.
    ///
    /// Only an app list failure is returned as `Err`.
    pub async fn aggregate(&self) -> Result<DiscoveryResult, LookupFailure> {
        let apps = self.list_apps().await?;
        debug!("Discovered {} apps", apps.len());

        let topologies = join_all(apps.iter().map(|app| self.app_topology(app))).await;

        let mut result = DiscoveryResult::new(apps.clone());
        for (app, topology) in apps.into_iter().zip(topologies) {
            if let Some(topology) = topology {
                result.push_app(app, topology);
            }
        }

        Ok(result)
    }

    /// `None` when the app's regions cannot be resolved
    async fn app_topology(&self, app: &str) -> Option<AppTopology> {
        let (regions, instances) =
            tokio::join!(self.list_regions(app), self.list_all_instances(app));

        let regions = match regions {
            Ok(regions) => regions,
            Err(e) => {
                debug!("Skipping app {}: {}", app, e);
                return None;
            }
        };

        let region_instances = join_all(regions.iter().map(|region| async move {
            RegionInstances {
                region: region.clone(),
                instances: self.list_instances_in_region(region, app).await.into(),
            }
        }))
        .await;

        Some(AppTopology {
            regions,
            instances: LookupOutcome::from(instances),
            region_instances,
        })
    }

    async fn txt_list(&self, name: &str) -> Result<Vec<String>, LookupFailure> {
        let parsed = match self.dns.lookup_txt(name).await {
            Ok(records) => names::parse_txt_list(name, &records),
            Err(e) => Err(e),
        };
        if let Err(e) = &parsed {
            warn!("⚠️  {}", e);
        }
        parsed
    }

    async fn aaaa_list(&self, name: &str) -> Result<Vec<Instance>, LookupFailure> {
        let result = self.dns.lookup_aaaa(name).await;
        if let Err(e) = &result {
            warn!("⚠️  {}", e);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::testing::FakeDns;
    use crate::types::{DiscoveryEntry, FailureKind};
    use serde_json::json;

    fn aggregator(dns: FakeDns) -> DiscoveryAggregator {
        DiscoveryAggregator::new(Arc::new(dns))
    }

    fn addr(s: &str) -> Instance {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_empty_txt_value_means_no_apps() {
        let dns = FakeDns::new().txt("_apps.internal", "");
        let agg = aggregator(dns);

        assert!(agg.list_apps().await.unwrap().is_empty());

        let result = agg.aggregate().await.unwrap();
        assert_eq!(result.entries().len(), 1);
        assert!(result.all_apps().is_empty());
    }

    #[tokio::test]
    async fn test_empty_region_list() {
        let dns = FakeDns::new()
            .txt("_apps.internal", "app1")
            .txt("regions.app1.internal", "")
            .aaaa("global.app1.internal", &["fdaa::1"]);
        let agg = aggregator(dns);

        assert!(agg.list_regions("app1").await.unwrap().is_empty());

        let result = agg.aggregate().await.unwrap();
        let topology = result.app("app1").unwrap();
        assert!(topology.regions.is_empty());
        assert!(topology.region_instances.is_empty());
    }

    #[tokio::test]
    async fn test_app_list_failure_aborts() {
        let dns = FakeDns::new()
            .fail_txt("_apps.internal", FailureKind::Timeout)
            .txt("regions.app1.internal", "us");
        let agg = aggregator(dns);

        let err = agg.aggregate().await.unwrap_err();
        assert_eq!(err.query, "_apps.internal");
        assert_eq!(err.kind, FailureKind::Timeout);
    }

    #[tokio::test]
    async fn test_missing_apps_record_aborts() {
        let agg = aggregator(FakeDns::new());
        let err = agg.aggregate().await.unwrap_err();
        assert_eq!(err.kind, FailureKind::NotFound);
    }

    #[tokio::test]
    async fn test_one_region_failure_omits_only_that_app() {
        let dns = FakeDns::new()
            .txt("_apps.internal", "a,b,c")
            .txt("regions.a.internal", "us")
            .fail_txt("regions.b.internal", FailureKind::NotFound)
            .txt("regions.c.internal", "eu")
            .aaaa("us.a.internal", &["fdaa::a"])
            .aaaa("eu.c.internal", &["fdaa::c"]);
        let agg = aggregator(dns);

        let result = agg.aggregate().await.unwrap();
        assert_eq!(result.all_apps(), ["a", "b", "c"]);
        assert_eq!(result.app_entry_count(), 2);
        assert!(result.app("b").is_none());

        // App entries follow app list order
        let names: Vec<_> = result
            .entries()
            .iter()
            .filter_map(|e| match e {
                DiscoveryEntry::App { name, .. } => Some(name.as_str()),
                DiscoveryEntry::AllApps(_) => None,
            })
            .collect();
        assert_eq!(names, ["a", "c"]);
    }

    #[tokio::test]
    async fn test_region_instance_failure_stays_visible() {
        let dns = FakeDns::new()
            .txt("_apps.internal", "app1")
            .txt("regions.app1.internal", "a,b")
            .aaaa("global.app1.internal", &["fdaa::1", "fdaa::2"])
            .aaaa("a.app1.internal", &["fdaa::1"])
            .fail_aaaa("b.app1.internal", FailureKind::NotFound);
        let agg = aggregator(dns);

        let result = agg.aggregate().await.unwrap();
        let topology = result.app("app1").unwrap();

        assert_eq!(topology.region_instances.len(), 2);
        assert_eq!(topology.region_instances[0].region, "a");
        assert_eq!(
            topology.region_instances[0].instances,
            LookupOutcome::Resolved(vec![addr("fdaa::1")])
        );
        assert_eq!(topology.region_instances[1].region, "b");
        assert!(topology.region_instances[1].instances.is_failed());
        assert_eq!(result.failure_count(), 1);
    }

    #[tokio::test]
    async fn test_global_instance_failure_stays_visible() {
        let dns = FakeDns::new()
            .txt("_apps.internal", "app1")
            .txt("regions.app1.internal", "us")
            .aaaa("us.app1.internal", &["fdaa::1"]);
        let agg = aggregator(dns);

        let result = agg.aggregate().await.unwrap();
        let topology = result.app("app1").unwrap();
        assert!(topology.instances.is_failed());
        assert!(!topology.region_instances[0].instances.is_failed());
    }

    #[tokio::test]
    async fn test_only_first_txt_record_is_read() {
        let dns = FakeDns::new().txt_records(
            "regions.app1.internal",
            vec![
                vec!["us,eu".to_string(), "sa".to_string()],
                vec!["ap".to_string()],
            ],
        );
        let agg = aggregator(dns);

        assert_eq!(agg.list_regions("app1").await.unwrap(), ["us", "eu"]);
    }

    #[tokio::test]
    async fn test_resolver_order_is_kept() {
        let dns = FakeDns::new().aaaa("global.app1.internal", &["fdaa::9", "fdaa::1", "fdaa::9"]);
        let agg = aggregator(dns);

        let instances = agg.list_all_instances("app1").await.unwrap();
        assert_eq!(instances, vec![addr("fdaa::9"), addr("fdaa::1"), addr("fdaa::9")]);
    }

    #[tokio::test]
    async fn test_concrete_scenario_document() {
        let dns = FakeDns::new()
            .txt("_apps.internal", "app1,app2")
            .txt("regions.app1.internal", "us,eu")
            .aaaa("global.app1.internal", &["fdaa::1"])
            .aaaa("us.app1.internal", &["fdaa::1"])
            .aaaa("eu.app1.internal", &["fdaa::2"])
            .fail_txt("regions.app2.internal", FailureKind::Other);
        let agg = aggregator(dns);

        let result = agg.aggregate().await.unwrap();
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!([
                { "allapps": ["app1", "app2"] },
                { "app1": {
                    "appregions": ["us", "eu"],
                    "appinstances": ["fdaa::1"],
                    "regioninstances": [
                        { "us": ["fdaa::1"] },
                        { "eu": ["fdaa::2"] },
                    ],
                } },
            ])
        );
    }
}
