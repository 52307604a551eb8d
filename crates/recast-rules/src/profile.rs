use crate::rules::RuleSet;
use serde::{Deserialize, Serialize};

/// Family name used when no profile matches an image.
pub const UNKNOWN_FAMILY: &str = "unknown";

/// Per-OS attributes the downstream generator needs to retarget a system.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct OsProfile {
    pub family: String,
    pub display_name: String,
    /// Substrings of the lowercased resolved image reference selecting this family.
    pub detect: Vec<String>,
    pub package_manager: String,
    pub container_template: String,
    pub service_manager: String,
    #[serde(default)]
    pub default: bool,
}

impl RuleSet {
    /// Detect the OS family of a resolved base image reference.
    ///
    /// Returns [`UNKNOWN_FAMILY`] for the empty-filesystem sentinel, an empty
    /// reference, or anything no profile claims.
    pub fn detect_family(&self, image: &str) -> &str {
        let img = image.trim().to_lowercase();
        if img.is_empty() || img == self.terminal.sentinel {
            return UNKNOWN_FAMILY;
        }
        self.os
            .iter()
            .find(|p| {
                p.detect
                    .iter()
                    .any(|d| !d.is_empty() && img.contains(d.as_str()))
            })
            .map_or(UNKNOWN_FAMILY, |p| p.family.as_str())
    }

    pub fn profile(&self, family: &str) -> Option<&OsProfile> {
        self.os.iter().find(|p| p.family == family)
    }

    /// Profile for `family`, falling back to the profile marked `default`
    /// (or the first one) when the family is unknown.
    pub fn profile_or_default(&self, family: &str) -> Option<&OsProfile> {
        self.profile(family)
            .or_else(|| self.os.iter().find(|p| p.default))
            .or_else(|| self.os.first())
    }
}

#[cfg(test)]
mod tests {
    use crate::builtin;
    use crate::profile::UNKNOWN_FAMILY;

    #[test]
    fn detects_builtin_families() {
        let rules = builtin();
        assert_eq!(rules.detect_family("alpine:3.21"), "alpine");
        assert_eq!(rules.detect_family("ubuntu:noble"), "debian");
        assert_eq!(
            rules.detect_family("ghcr.io/linuxserver/baseimage-ubuntu:noble"),
            "debian"
        );
        assert_eq!(rules.detect_family("node:20-alpine"), "alpine");
        assert_eq!(rules.detect_family("Debian:Bookworm"), "debian");
    }

    #[test]
    fn sentinel_and_custom_images_are_unknown() {
        let rules = builtin();
        assert_eq!(rules.detect_family("scratch"), UNKNOWN_FAMILY);
        assert_eq!(rules.detect_family(""), UNKNOWN_FAMILY);
        assert_eq!(rules.detect_family("portainer/base"), UNKNOWN_FAMILY);
    }

    #[test]
    fn profile_fallback_uses_default() {
        let rules = builtin();
        let p = rules.profile_or_default(UNKNOWN_FAMILY).unwrap();
        assert!(p.default);
        assert_eq!(rules.profile("alpine").unwrap().package_manager, "apk");
        assert!(rules.profile("plan9").is_none());
    }
}
