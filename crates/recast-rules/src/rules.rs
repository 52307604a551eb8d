use crate::profile::OsProfile;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Kind name reserved for sub-commands nothing recognised.
pub const UNKNOWN_KIND: &str = "unknown";

#[derive(Debug, Error)]
pub enum RulesError {
    #[error("failed to read rules file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse rules: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("unsupported rules_version: {0}, expected 1")]
    UnsupportedVersion(u32),
    #[error("os profile family must not be empty")]
    EmptyFamily,
    #[error("os profile family '{0}' is declared more than once")]
    DuplicateFamily(String),
    #[error("os profile '{0}' has no detect patterns")]
    EmptyDetect(String),
    #[error("more than one os profile is marked default: '{0}' and '{1}'")]
    MultipleDefaults(String, String),
    #[error("command type #{0} has an empty prefix or kind")]
    EmptyCommandType(usize),
    #[error("command type kind '{0}' is reserved")]
    ReservedKind(String),
    #[error("source convention '{namespace}' template must contain {{name}} and {{branch}}: '{template}'")]
    InvalidSourceTemplate { namespace: String, template: String },
    #[error("rule tables are already installed for this process")]
    AlreadyInstalled,
}

/// The complete classification table set.
///
/// Built once per process (see [`crate::install`] and [`crate::active`]) and only
/// ever read afterwards.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RuleSet {
    pub rules_version: u32,
    #[serde(default)]
    pub os: Vec<OsProfile>,
    #[serde(default)]
    pub noise: NoiseRules,
    #[serde(default)]
    pub command_types: Vec<CommandType>,
    #[serde(default)]
    pub terminal: TerminalRules,
    #[serde(default)]
    pub environment: EnvironmentRules,
    #[serde(default)]
    pub sources: Vec<SourceConvention>,
    #[serde(default)]
    pub startup: StartupRules,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct NoiseRules {
    #[serde(default)]
    pub exact: Vec<String>,
    #[serde(default)]
    pub prefixes: Vec<String>,
    #[serde(default)]
    pub contains: Vec<String>,
}

impl NoiseRules {
    /// True when a trimmed sub-command is shell noise per the table.
    pub fn matches(&self, cmd: &str) -> bool {
        self.exact.iter().any(|e| e == cmd)
            || self.prefixes.iter().any(|p| cmd.starts_with(p.as_str()))
            || self.contains.iter().any(|c| cmd.contains(c.as_str()))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CommandType {
    pub prefix: String,
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TerminalRules {
    #[serde(default = "default_sentinel")]
    pub sentinel: String,
    #[serde(default)]
    pub namespaces: Vec<String>,
    #[serde(default)]
    pub names: Vec<String>,
}

impl Default for TerminalRules {
    fn default() -> Self {
        Self {
            sentinel: default_sentinel(),
            namespaces: Vec::new(),
            names: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentRules {
    #[serde(default)]
    pub deny: Vec<String>,
}

impl EnvironmentRules {
    pub fn is_denied(&self, key: &str) -> bool {
        self.deny.iter().any(|d| d == key)
    }
}

/// An organisation's image-to-repository naming convention.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SourceConvention {
    /// Substring of the lowercased image reference that selects this convention.
    pub namespace: String,
    /// URL template with `{name}` (bare repository name) and `{branch}` placeholders.
    pub template: String,
    pub branch: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct StartupRules {
    #[serde(default)]
    pub init_commands: Vec<String>,
    #[serde(default)]
    pub init_prefixes: Vec<String>,
}

impl StartupRules {
    /// True when a startup candidate is a container init wrapper rather than the service.
    pub fn is_init(&self, cmd: &str) -> bool {
        let trimmed = cmd.trim();
        self.init_commands.iter().any(|c| c == trimmed)
            || self
                .init_prefixes
                .iter()
                .any(|p| trimmed.starts_with(p.as_str()))
    }
}

fn default_sentinel() -> String {
    "scratch".to_owned()
}

impl RuleSet {
    /// Check structural constraints serde cannot express.
    pub fn validate(&self) -> Result<(), RulesError> {
        if self.rules_version != 1 {
            return Err(RulesError::UnsupportedVersion(self.rules_version));
        }

        let mut families = HashSet::new();
        let mut default_family: Option<&str> = None;
        for profile in &self.os {
            let family = profile.family.trim();
            if family.is_empty() {
                return Err(RulesError::EmptyFamily);
            }
            if !families.insert(family) {
                return Err(RulesError::DuplicateFamily(family.to_owned()));
            }
            if profile.detect.iter().all(|d| d.trim().is_empty()) {
                return Err(RulesError::EmptyDetect(family.to_owned()));
            }
            if profile.default {
                if let Some(existing) = default_family {
                    return Err(RulesError::MultipleDefaults(
                        existing.to_owned(),
                        family.to_owned(),
                    ));
                }
                default_family = Some(family);
            }
        }

        for (idx, ct) in self.command_types.iter().enumerate() {
            if ct.prefix.trim().is_empty() || ct.kind.trim().is_empty() {
                return Err(RulesError::EmptyCommandType(idx));
            }
            if ct.kind == UNKNOWN_KIND {
                return Err(RulesError::ReservedKind(ct.kind.clone()));
            }
        }

        for src in &self.sources {
            if !src.template.contains("{name}") || !src.template.contains("{branch}") {
                return Err(RulesError::InvalidSourceTemplate {
                    namespace: src.namespace.clone(),
                    template: src.template.clone(),
                });
            }
        }

        Ok(())
    }

    /// Generic action kind for a sub-command, first prefix match wins.
    pub fn command_kind(&self, cmd: &str) -> Option<&str> {
        self.command_types
            .iter()
            .find(|ct| cmd.starts_with(ct.prefix.as_str()))
            .map(|ct| ct.kind.as_str())
    }

    /// Convention whose namespace appears in the lowercased image reference.
    pub fn source_for(&self, image_lower: &str) -> Option<&SourceConvention> {
        self.sources
            .iter()
            .find(|s| image_lower.contains(s.namespace.as_str()))
    }
}

pub fn parse_rules_str(input: &str) -> Result<RuleSet, RulesError> {
    let rules: RuleSet = toml::from_str(input)?;
    rules.validate()?;
    Ok(rules)
}

pub fn parse_rules_file(path: impl AsRef<Path>) -> Result<RuleSet, RulesError> {
    let content = fs::read_to_string(path)?;
    parse_rules_str(&content)
}
