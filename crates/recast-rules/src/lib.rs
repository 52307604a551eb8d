//! Declarative classification tables for recast.
//!
//! This crate owns every piece of data the parser and chain resolver classify
//! against: base-OS detection rules and per-OS profiles (`OsProfile`), shell
//! noise patterns, the generic command-type table, terminal base images, the
//! environment deny-list, source-repository conventions, and init-wrapper
//! commands. Tables are loaded from TOML, validated, and installed once per
//! process; afterwards they are only read.

pub mod profile;
pub mod rules;

pub use profile::{OsProfile, UNKNOWN_FAMILY};
pub use rules::{
    parse_rules_file, parse_rules_str, CommandType, EnvironmentRules, NoiseRules, RuleSet,
    RulesError, SourceConvention, StartupRules, TerminalRules, UNKNOWN_KIND,
};

use std::sync::{LazyLock, OnceLock};

/// Tables shipped with the crate.
pub const DEFAULT_RULES: &str = include_str!("../rules/default.toml");

static BUILTIN: LazyLock<RuleSet> = LazyLock::new(|| {
    parse_rules_str(DEFAULT_RULES).expect("embedded default rules must be valid")
});

static INSTALLED: OnceLock<RuleSet> = OnceLock::new();

/// The embedded default tables.
pub fn builtin() -> &'static RuleSet {
    &BUILTIN
}

/// Install the process-wide tables. Call once at startup, before any parse.
///
/// A second call fails with [`RulesError::AlreadyInstalled`]; tables are never
/// rebuilt once readers may hold references to them.
pub fn install(rules: RuleSet) -> Result<(), RulesError> {
    rules.validate()?;
    INSTALLED
        .set(rules)
        .map_err(|_| RulesError::AlreadyInstalled)?;
    tracing::debug!("installed custom rule tables");
    Ok(())
}

/// The tables in effect: the installed set, or the built-in defaults.
pub fn active() -> &'static RuleSet {
    INSTALLED.get().unwrap_or_else(builtin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_rules_parse_and_validate() {
        let rules = builtin();
        assert_eq!(rules.rules_version, 1);
        assert!(rules.os.iter().any(|p| p.family == "alpine"));
        assert!(rules.os.iter().any(|p| p.family == "debian"));
        assert_eq!(rules.os.iter().filter(|p| p.default).count(), 1);
        assert!(rules.environment.is_denied("PUID"));
        assert!(rules.terminal.names.iter().any(|n| n == "alpine"));
        assert!(!rules.sources.is_empty());
    }

    #[test]
    fn active_defaults_to_builtin() {
        // Nothing in this test binary installs custom tables.
        assert_eq!(active(), builtin());
    }
}
