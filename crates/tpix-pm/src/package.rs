//! Package identity.
//!
//! A package published on the registry is addressed by the triple
//! `(namespace, name, version)` and written as `@namespace/name:version`,
//! the same form Typst uses in `#import` statements.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Result, TpixError};

/// Identity of one distributable package version.
///
/// Each part is a single path component: non-empty, not `.` or `..`, and
/// free of `/`, `\` and `:`. That keeps [`key`](Self::key) injective and
/// the cache directory of a package inside the cache root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawPackageRef")]
pub struct PackageRef {
    namespace: String,
    name: String,
    version: String,
}

/// Unchecked wire form of a [`PackageRef`]
#[derive(Deserialize)]
struct RawPackageRef {
    namespace: String,
    name: String,
    version: String,
}

impl TryFrom<RawPackageRef> for PackageRef {
    type Error = TpixError;

    fn try_from(raw: RawPackageRef) -> Result<Self> {
        PackageRef::parse_parts(raw.namespace, raw.name, raw.version)
    }
}

impl PackageRef {
    /// Build a reference from parts known to be valid.
    ///
    /// # Panics
    ///
    /// Panics if a part is rejected by [`parse_parts`](Self::parse_parts).
    /// Use that for input from users, the registry or the filesystem.
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        match Self::parse_parts(namespace, name, version) {
            Ok(pkg) => pkg,
            Err(e) => panic!("{}", e),
        }
    }

    /// Build a reference, rejecting parts that are not a single path
    /// component
    pub fn parse_parts(
        namespace: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Result<Self> {
        let pkg = Self {
            namespace: namespace.into(),
            name: name.into(),
            version: version.into(),
        };

        for (kind, value) in [
            ("namespace", &pkg.namespace),
            ("name", &pkg.name),
            ("version", &pkg.version),
        ] {
            if let Some(problem) = part_problem(value) {
                return Err(TpixError::InvalidPackageRef(format!(
                    "@{}/{}:{}: {} {}",
                    pkg.namespace, pkg.name, pkg.version, kind, problem
                )));
            }
        }

        Ok(pkg)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Canonical string key, `@namespace/name:version`
    pub fn key(&self) -> String {
        format!("@{}/{}:{}", self.namespace, self.name, self.version)
    }
}

/// Why `part` cannot be used as one component of a package reference
fn part_problem(part: &str) -> Option<&'static str> {
    if part.is_empty() {
        Some("is empty")
    } else if part == "." || part == ".." {
        Some("must not be a relative path component")
    } else if part.contains(['/', '\\', ':']) {
        Some("must not contain '/', '\\' or ':'")
    } else if part.chars().any(char::is_control) {
        Some("must not contain control characters")
    } else {
        None
    }
}

impl fmt::Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}/{}:{}", self.namespace, self.name, self.version)
    }
}

impl FromStr for PackageRef {
    type Err = TpixError;

    fn from_str(s: &str) -> Result<Self> {
        let spec: PackageSpec = s.parse()?;
        match spec.version {
            Some(version) => PackageRef::parse_parts(spec.namespace, spec.name, version),
            None => Err(TpixError::InvalidPackageRef(format!(
                "{}: expected @namespace/name:version",
                s
            ))),
        }
    }
}

/// A package reference as typed by a user, where the version may be omitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    pub namespace: String,
    pub name: String,
    pub version: Option<String>,
}

impl PackageSpec {
    /// Pin this spec to a concrete version
    pub fn with_version(&self, version: impl Into<String>) -> Result<PackageRef> {
        PackageRef::parse_parts(self.namespace.clone(), self.name.clone(), version)
    }
}

impl FromStr for PackageSpec {
    type Err = TpixError;

    /// Parses `@namespace/name[:version]`; the leading `@` is optional.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || {
            TpixError::InvalidPackageRef(format!(
                "{}: use the format @namespace/name[:version]",
                s
            ))
        };

        let trimmed = s.trim().strip_prefix('@').unwrap_or(s.trim());
        let (namespace, rest) = trimmed.split_once('/').ok_or_else(invalid)?;

        let (name, version) = match rest.split_once(':') {
            Some((name, version)) => (name, Some(version)),
            None => (rest, None),
        };

        for part in [Some(namespace), Some(name), version].into_iter().flatten() {
            if part_problem(part).is_some() {
                return Err(invalid());
            }
        }
        let version = version.map(str::to_string);

        Ok(PackageSpec {
            namespace: namespace.to_string(),
            name: name.to_string(),
            version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_key_format() {
        let pkg = PackageRef::new("preview", "cetz", "0.2.2");
        assert_eq!(pkg.key(), "@preview/cetz:0.2.2");
        assert_eq!(pkg.to_string(), pkg.key());
    }

    #[test]
    fn test_key_is_stable() {
        let pkg = PackageRef::new("preview", "cetz", "0.2.2");
        let first = pkg.key();
        for _ in 0..10 {
            assert_eq!(pkg.key(), first);
        }
    }

    #[test]
    fn test_key_is_injective() {
        let refs = [
            PackageRef::new("preview", "cetz", "0.2.2"),
            PackageRef::new("preview", "cetz", "0.2.3"),
            PackageRef::new("preview", "cetz-plot", "0.2.2"),
            PackageRef::new("local", "cetz", "0.2.2"),
            PackageRef::new("pre", "viewcetz", "0.2.2"),
        ];

        let keys: HashSet<String> = refs.iter().map(PackageRef::key).collect();
        assert_eq!(keys.len(), refs.len());

        for pkg in &refs {
            let parsed: PackageRef = pkg.key().parse().unwrap();
            assert_eq!(&parsed, pkg);
        }
    }

    #[test]
    fn test_parse_spec_with_version() {
        let spec: PackageSpec = "@preview/cetz:0.2.2".parse().unwrap();
        assert_eq!(spec.namespace, "preview");
        assert_eq!(spec.name, "cetz");
        assert_eq!(spec.version.as_deref(), Some("0.2.2"));
    }

    #[test]
    fn test_parse_spec_without_at_or_version() {
        let spec: PackageSpec = "preview/tablex".parse().unwrap();
        assert_eq!(spec.namespace, "preview");
        assert_eq!(spec.name, "tablex");
        assert_eq!(spec.version, None);

        let pkg = spec.with_version("0.0.8").unwrap();
        assert_eq!(pkg.key(), "@preview/tablex:0.0.8");
    }

    #[test]
    fn test_parse_invalid_specs() {
        for input in ["", "@preview", "@/cetz:1.0.0", "@preview/:1.0.0", "@preview/cetz:", "@a/b/c:1"] {
            assert!(input.parse::<PackageSpec>().is_err(), "{} should be rejected", input);
        }
    }

    #[test]
    fn test_parse_parts_rejects_path_components() {
        let cases = [
            ("..", "cetz", "0.2.2"),
            (".", "cetz", "0.2.2"),
            ("preview", "..", "0.2.2"),
            ("preview", "cetz", ".."),
            ("preview", "a/b", "0.2.2"),
            ("preview", "b\\c", "0.2.2"),
            ("preview", "x:y", "0.2.2"),
            ("preview", "cetz", "1.0/../../x"),
            ("", "cetz", "0.2.2"),
            ("preview", "", "0.2.2"),
            ("preview", "cetz", ""),
            ("preview", "ce\ntz", "0.2.2"),
        ];

        for (namespace, name, version) in cases {
            let result = PackageRef::parse_parts(namespace, name, version);
            assert!(
                matches!(result, Err(TpixError::InvalidPackageRef(_))),
                "{:?}/{:?}:{:?} should be rejected",
                namespace,
                name,
                version
            );
        }

        assert!(PackageRef::parse_parts("preview", "cetz-plot", "0.1.0-rc.1").is_ok());
    }

    #[test]
    fn test_keys_cannot_collide_through_separators() {
        // Both would render as @a/b/c:1
        assert!(PackageRef::parse_parts("a/b", "c", "1").is_err());
        assert!(PackageRef::parse_parts("a", "b/c", "1").is_err());
        // Both would render as @a/b:c:1
        assert!(PackageRef::parse_parts("a", "b:c", "1").is_err());
        assert!(PackageRef::parse_parts("a", "b", "c:1").is_err());
    }

    #[test]
    fn test_spec_rejects_relative_components() {
        for input in ["@../cetz:1.0.0", "@preview/..:1.0.0", "@preview/cetz:..", "@pre\\view/cetz"] {
            assert!(input.parse::<PackageSpec>().is_err(), "{} should be rejected", input);
        }

        let spec: PackageSpec = "@preview/cetz".parse().unwrap();
        assert!(spec.with_version("..").is_err());
        assert!(spec.with_version("1/2").is_err());
    }

    #[test]
    fn test_deserialize_validates_parts() {
        let pkg: PackageRef =
            serde_json::from_str(r#"{"namespace":"preview","name":"cetz","version":"0.2.2"}"#)
                .unwrap();
        assert_eq!(pkg.key(), "@preview/cetz:0.2.2");

        let escaped = serde_json::from_str::<PackageRef>(
            r#"{"namespace":"..","name":"..","version":"escape"}"#,
        );
        assert!(escaped.is_err());
    }

    #[test]
    #[should_panic]
    fn test_new_panics_on_invalid_parts() {
        PackageRef::new("preview", "../cetz", "0.2.2");
    }

    #[test]
    fn test_package_ref_requires_version() {
        assert!("@preview/cetz".parse::<PackageRef>().is_err());
    }
}
