//! `<owner>-<name>-<version>` identifiers.
//!
//! Both archive file names and dependency strings use this shape. The owner
//! may itself contain dashes, so the split is anchored at the end: the last
//! token is the version, the one before it the name.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ModError;

/// A parsed `<owner>-<name>-<version>` string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencySpec {
    pub owner: String,
    pub name: String,
    pub version: String,
    /// The string this spec was parsed from.
    pub raw: String,
}

impl DependencySpec {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let (owner, name, version) = split_identifier(raw).ok_or_else(|| {
            ModError::InvalidPackageName {
                name: raw.to_string(),
            }
        })?;
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
            version: version.to_string(),
            raw: raw.to_string(),
        })
    }

    /// `<owner>-<name>`, the key used by the remote catalog.
    pub fn full_name(&self) -> String {
        format!("{}-{}", self.owner, self.name)
    }
}

impl fmt::Display for DependencySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Parse an archive or directory name such as
/// `"Some-Owner-Modname-1.2.3 (1).zip"` into a spec.
///
/// A trailing extension and an OS duplicate-copy suffix (` (N)`) are
/// stripped before splitting.
pub fn parse_package_file_name(file_name: &str) -> anyhow::Result<DependencySpec> {
    let stem = strip_duplicate_suffix(strip_extension(file_name));
    let mut spec = DependencySpec::parse(stem).map_err(|_| ModError::InvalidPackageName {
        name: file_name.to_string(),
    })?;
    spec.raw = file_name.to_string();
    Ok(spec)
}

fn split_identifier(s: &str) -> Option<(&str, &str, &str)> {
    let (rest, version) = s.rsplit_once('-')?;
    let (owner, name) = rest.rsplit_once('-')?;
    if owner.is_empty() || name.is_empty() || version.is_empty() {
        return None;
    }
    Some((owner, name, version))
}

/// Version strings contain dots, so only a letter-led alphanumeric suffix
/// counts as an extension ("zip" yes, "3" or "3 (1)" no).
fn strip_extension(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && ext.starts_with(|c: char| c.is_ascii_alphabetic())
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            stem
        }
        _ => name,
    }
}

fn strip_duplicate_suffix(name: &str) -> &str {
    let Some(without_paren) = name.strip_suffix(')') else {
        return name;
    };
    let Some((stem, counter)) = without_paren.rsplit_once(" (") else {
        return name;
    };
    if !counter.is_empty() && counter.chars().all(|c| c.is_ascii_digit()) {
        stem
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::classify;

    #[test]
    fn test_parse_duplicate_copy_archive() {
        let spec = parse_package_file_name("Some-Owner-Modname-1.2.3 (1).zip").unwrap();
        assert_eq!(spec.owner, "Some-Owner");
        assert_eq!(spec.name, "Modname");
        assert_eq!(spec.version, "1.2.3");
    }

    #[test]
    fn test_parse_plain_directory_name() {
        let spec = parse_package_file_name("Owner-Modname-1.2.3").unwrap();
        assert_eq!(spec.name, "Modname");
        assert_eq!(spec.version, "1.2.3");
    }

    #[test]
    fn test_parse_duplicate_suffix_without_extension() {
        let spec = parse_package_file_name("Owner-Modname-2.0.0 (12)").unwrap();
        assert_eq!(spec.version, "2.0.0");
    }

    #[test]
    fn test_parse_rejects_short_names() {
        for name in ["Modname.zip", "Modname-1.0.0.zip", "-Modname-1.0.0", "Owner--1.0"] {
            let err = parse_package_file_name(name).unwrap_err();
            assert!(
                matches!(classify(&err), Some(ModError::InvalidPackageName { .. })),
                "{} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_parenthesised_text_is_not_a_duplicate_suffix() {
        assert_eq!(strip_duplicate_suffix("Owner-Mod-1.0 (copy)"), "Owner-Mod-1.0 (copy)");
        assert_eq!(strip_duplicate_suffix("Owner-Mod-1.0 (3)"), "Owner-Mod-1.0");
    }

    #[test]
    fn test_dependency_spec_uses_last_two_tokens() {
        let spec = DependencySpec::parse("Team-With-Dashes-CoolMod-0.4.1").unwrap();
        assert_eq!(spec.owner, "Team-With-Dashes");
        assert_eq!(spec.name, "CoolMod");
        assert_eq!(spec.version, "0.4.1");
        assert_eq!(spec.full_name(), "Team-With-Dashes-CoolMod");
        assert_eq!(spec.to_string(), "Team-With-Dashes-CoolMod-0.4.1");
    }
}
