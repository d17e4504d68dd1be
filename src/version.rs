//! Version specifier resolution
//!
//! Platforms advertise full versions (`3.11.4`, `20.11.1`), while callers and
//! detectors frequently hand over partial specifiers (`3`, `3.11`). Resolution
//! picks the highest supported version the specifier is a prefix of.

use std::cmp::Ordering;

fn components(version: &str) -> Vec<&str> {
    version.split('.').collect()
}

fn numeric(component: &str) -> u64 {
    component.trim().parse::<u64>().unwrap_or(0)
}

/// Strips whitespace and a leading `v` from a specifier.
pub fn normalize(specifier: &str) -> &str {
    let trimmed = specifier.trim();
    trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed)
}

/// Numeric, component-wise comparison. Missing components count as zero.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let a_parts = components(a);
    let b_parts = components(b);

    for i in 0..a_parts.len().max(b_parts.len()) {
        let a_part = a_parts.get(i).map(|p| numeric(p)).unwrap_or(0);
        let b_part = b_parts.get(i).map(|p| numeric(p)).unwrap_or(0);

        match a_part.cmp(&b_part) {
            Ordering::Equal => continue,
            other => return other,
        }
    }

    Ordering::Equal
}

/// True when every component of `specifier` equals the matching component of `version`.
///
/// `"1.1"` is a prefix of `"1.1.5"` but not of `"1.10.0"`.
pub fn is_prefix_of(specifier: &str, version: &str) -> bool {
    let spec_parts = components(specifier);
    let version_parts = components(version);

    if spec_parts.len() > version_parts.len() {
        return false;
    }

    spec_parts
        .iter()
        .zip(version_parts.iter())
        .all(|(s, v)| s.trim() == v.trim())
}

/// Returns the highest version in `supported` that `specifier` selects.
///
/// An exact member is returned as is; otherwise the numerically highest
/// entry having `specifier` as a component prefix wins.
pub fn resolve_max_satisfying<S: AsRef<str>>(specifier: &str, supported: &[S]) -> Option<String> {
    let specifier = normalize(specifier);
    if specifier.is_empty() {
        return None;
    }

    if let Some(exact) = supported.iter().find(|v| v.as_ref() == specifier) {
        return Some(exact.as_ref().to_string());
    }

    supported
        .iter()
        .map(|v| v.as_ref())
        .filter(|v| is_prefix_of(specifier, v))
        .max_by(|a, b| compare_versions(a, b))
        .map(str::to_string)
}

/// Sorts versions highest first.
pub fn sort_descending(versions: &mut [String]) {
    versions.sort_by(|a, b| compare_versions(b, a));
}
