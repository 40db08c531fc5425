//! Discovery Module
//!
//! Reads application topology out of the private network DNS.
//!
//! ## DNS Records
//!
//! - TXT `_apps.internal`: all app names
//! - TXT `regions.<app>.internal`: regions an app runs in
//! - AAAA `<region>.<app>.internal`: instances in one region
//! - AAAA `global.<app>.internal`: every instance of an app

mod aggregator;
pub mod names;
mod resolver;

pub use aggregator::DiscoveryAggregator;
pub use resolver::{DnsLookup, HickoryLookup};
