//! Ordering of installed version directories.
//!
//! Only ordering lives here. Dependency matching is exact string equality
//! and never goes through this comparison.

use std::cmp::Ordering;

/// Compare two version strings component by component.
///
/// Dot-separated components that are both numeric compare as numbers,
/// anything else compares as text; a version with extra components sorts
/// after its prefix (`1.0` < `1.0.1`).
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');

    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (Some(x), Some(y)) => {
                let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(nx), Ok(ny)) => nx.cmp(&ny),
                    _ => x.cmp(y),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

/// Sort versions newest first.
pub fn sort_descending(versions: &mut [String]) {
    versions.sort_by(|a, b| compare_versions(b, a));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_components_compare_as_numbers() {
        assert_eq!(compare_versions("1.10.0", "1.9.0"), Ordering::Greater);
        assert_eq!(compare_versions("2.0.0", "10.0.0"), Ordering::Less);
        assert_eq!(compare_versions("1.0.0", "1.0.0"), Ordering::Equal);
    }

    #[test]
    fn test_longer_version_sorts_after_prefix() {
        assert_eq!(compare_versions("1.0", "1.0.1"), Ordering::Less);
    }

    #[test]
    fn test_non_numeric_components_fall_back_to_text() {
        assert_eq!(compare_versions("1.0.beta", "1.0.alpha"), Ordering::Greater);
    }

    #[test]
    fn test_sort_descending() {
        let mut versions = vec![
            "1.0.0".to_string(),
            "10.0.0".to_string(),
            "2.0.0".to_string(),
        ];
        sort_descending(&mut versions);
        assert_eq!(versions, vec!["10.0.0", "2.0.0", "1.0.0"]);
    }
}
