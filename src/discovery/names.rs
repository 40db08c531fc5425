//! DNS Name Conventions
//!
//! The private network DNS encodes topology in fixed names under `.internal`:
//!
//! - `_apps.internal` (TXT): comma separated app names
//! - `regions.<app>.internal` (TXT): comma separated regions of an app
//! - `<region>.<app>.internal` (AAAA): instances of an app in a region
//! - `global.<app>.internal` (AAAA): all instances of an app

use crate::types::LookupFailure;

/// TXT name listing every app
pub const APPS_NAME: &str = "_apps.internal";

/// Label used for the all-regions instance query
const GLOBAL_LABEL: &str = "global";

const INTERNAL_SUFFIX: &str = "internal";

pub fn regions_name(app: &str) -> String {
    format!("regions.{app}.{INTERNAL_SUFFIX}")
}

pub fn region_instances_name(region: &str, app: &str) -> String {
    format!("{region}.{app}.{INTERNAL_SUFFIX}")
}

pub fn global_instances_name(app: &str) -> String {
    region_instances_name(GLOBAL_LABEL, app)
}

/// Split a comma separated TXT value into its members.
///
/// An empty value is the empty list. Segments are kept verbatim, so joining
/// the output with `,` gives back the input.
pub fn split_list(value: &str) -> Vec<String> {
    if value.is_empty() {
        return Vec::new();
    }
    value.split(',').map(str::to_string).collect()
}

/// Parse a TXT answer following the list convention.
///
/// Only the first character string of the first record is read.
pub fn parse_txt_list(query: &str, records: &[Vec<String>]) -> Result<Vec<String>, LookupFailure> {
    let record = records
        .first()
        .ok_or_else(|| LookupFailure::malformed(query, "answer contains no TXT record"))?;

    let value = record
        .first()
        .ok_or_else(|| LookupFailure::malformed(query, "TXT record has no character string"))?;

    Ok(split_list(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FailureKind;

    #[test]
    fn test_names() {
        assert_eq!(APPS_NAME, "_apps.internal");
        assert_eq!(regions_name("app1"), "regions.app1.internal");
        assert_eq!(region_instances_name("us", "app1"), "us.app1.internal");
        assert_eq!(global_instances_name("app1"), "global.app1.internal");
    }

    #[test]
    fn test_empty_value_is_empty_list() {
        assert!(split_list("").is_empty());
        let parsed = parse_txt_list(APPS_NAME, &[vec![String::new()]]).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_split_join_roundtrip() {
        for value in ["app1", "app1,app2", "a,b,c,d", "a,,b", "x,"] {
            let parts = split_list(value);
            assert_eq!(parts.join(","), value);
        }
    }

    #[test]
    fn test_only_first_string_of_first_record() {
        let records = vec![
            vec!["us,eu".to_string(), "ignored".to_string()],
            vec!["ap".to_string()],
        ];
        let parsed = parse_txt_list("regions.app1.internal", &records).unwrap();
        assert_eq!(parsed, vec!["us", "eu"]);
    }

    #[test]
    fn test_missing_record_is_malformed() {
        let err = parse_txt_list(APPS_NAME, &[]).unwrap_err();
        assert_eq!(err.kind, FailureKind::Malformed);
        assert_eq!(err.query, APPS_NAME);

        let err = parse_txt_list(APPS_NAME, &[vec![]]).unwrap_err();
        assert_eq!(err.kind, FailureKind::Malformed);
    }
}
