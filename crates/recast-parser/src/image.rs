//! Build-argument substitution and stage-alias resolution for base images.

use crate::types::LayerLabel;
use recast_rules::UNKNOWN_FAMILY;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Upper bound on substitute-then-alias rounds for one reference.
const MAX_RESOLVE_ROUNDS: usize = 16;

static VAR_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?:(:?-)([^}]*))?\}|\$([A-Za-z_][A-Za-z0-9_]*)")
        .expect("valid variable reference pattern")
});

static UNRESOLVED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{?[A-Za-z_]").expect("valid unresolved pattern"));

/// Substitute `${name}`, `${name:-default}`, `${name-default}` and `$name`.
///
/// References `lookup` cannot answer and that carry no default are left as
/// written.
pub fn substitute<'a>(text: &str, lookup: impl Fn(&str) -> Option<&'a str>) -> String {
    if !text.contains('$') {
        return text.to_owned();
    }
    VAR_REF
        .replace_all(text, |caps: &Captures<'_>| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(4))
                .map_or("", |m| m.as_str());
            let value = lookup(name);
            match (value, caps.get(2), caps.get(3)) {
                // `:-` also replaces an empty value
                (Some(v), Some(op), Some(default)) if v.is_empty() && op.as_str() == ":-" => {
                    default.as_str().to_owned()
                }
                (Some(v), _, _) => v.to_owned(),
                (None, Some(_), Some(default)) => default.as_str().to_owned(),
                (None, _, _) => caps[0].to_owned(),
            }
        })
        .into_owned()
}

/// True when `text` still contains a variable reference.
pub fn has_unresolved_ref(text: &str) -> bool {
    UNRESOLVED.is_match(text)
}

/// Registry and namespace stripped: `ghcr.io/linuxserver/baseimage-alpine:3.21`
/// becomes `baseimage-alpine:3.21`.
pub fn short_image(image: &str) -> &str {
    image.rsplit('/').next().unwrap_or(image)
}

/// Provenance label for a layer built on `image`.
pub fn layer_label(image: &str) -> LayerLabel {
    match short_image(image) {
        "" => LayerLabel::from(UNKNOWN_FAMILY),
        short => LayerLabel::from(short),
    }
}

/// Per-parse record of build arguments, stage aliases and stage images.
#[derive(Debug, Default)]
pub struct StageTable {
    args: HashMap<String, String>,
    aliases: HashMap<String, String>,
    images: Vec<String>,
}

impl StageTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an `ARG`. Only arguments with a default are substitutable; a
    /// later default for the same name replaces the earlier one.
    pub fn declare_arg(&mut self, name: &str, default: Option<&str>) {
        if let Some(value) = default {
            self.args.insert(name.to_owned(), value.to_owned());
        }
    }

    pub fn arg(&self, name: &str) -> Option<&str> {
        self.args.get(name).map(String::as_str)
    }

    /// Record a stage declaration with its raw image reference.
    pub fn declare_stage(&mut self, image: &str, alias: Option<&str>) {
        if let Some(alias) = alias {
            self.aliases.insert(alias.to_lowercase(), image.to_owned());
        }
        self.images.push(image.to_owned());
    }

    pub fn stage_count(&self) -> usize {
        self.images.len()
    }

    /// Substitute known build arguments into `text`.
    pub fn substitute_args(&self, text: &str) -> String {
        substitute(text, |name| self.arg(name))
    }

    /// Resolve a reference through argument substitution and alias lookup
    /// until neither changes it, bounded to guarantee termination.
    pub fn resolve(&self, image: &str) -> String {
        let mut current = image.trim().to_owned();
        for _ in 0..MAX_RESOLVE_ROUNDS {
            let substituted = self.substitute_args(&current);
            let next = self
                .aliases
                .get(&substituted.to_lowercase())
                .cloned()
                .unwrap_or(substituted);
            if next == current {
                return current;
            }
            current = next;
        }
        tracing::debug!(image, resolved = %current, "image resolution hit round limit");
        current
    }

    /// Resolve the final stage's base image.
    ///
    /// When the final stage resolves to the empty-filesystem `sentinel` and an
    /// earlier stage exists, the second-to-last stage is resolved instead.
    pub fn resolve_final(&self, sentinel: &str) -> Option<String> {
        let last = self.images.last()?;
        let resolved = self.resolve(last);
        if resolved.eq_ignore_ascii_case(sentinel) && self.images.len() >= 2 {
            return Some(self.resolve(&self.images[self.images.len() - 2]));
        }
        Some(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_all_reference_forms() {
        let mut table = StageTable::new();
        table.declare_arg("VERSION", Some("3.21"));
        table.declare_arg("EMPTY", Some(""));
        assert_eq!(table.substitute_args("alpine:${VERSION}"), "alpine:3.21");
        assert_eq!(table.substitute_args("alpine:$VERSION"), "alpine:3.21");
        assert_eq!(table.substitute_args("x:${MISSING:-fallback}"), "x:fallback");
        assert_eq!(table.substitute_args("x:${MISSING-fallback}"), "x:fallback");
        assert_eq!(table.substitute_args("x:${EMPTY:-fallback}"), "x:fallback");
        assert_eq!(table.substitute_args("x:${EMPTY-fallback}"), "x:");
        assert_eq!(table.substitute_args("x:${MISSING}"), "x:${MISSING}");
    }

    #[test]
    fn args_without_default_stay_unresolved() {
        let mut table = StageTable::new();
        table.declare_arg("BASE", None);
        table.declare_stage("${BASE}", None);
        assert_eq!(table.resolve_final("scratch").as_deref(), Some("${BASE}"));
    }

    #[test]
    fn later_arg_default_wins() {
        let mut table = StageTable::new();
        table.declare_arg("TAG", Some("1"));
        table.declare_arg("TAG", Some("2"));
        assert_eq!(table.substitute_args("img:${TAG}"), "img:2");
    }

    #[test]
    fn follows_chained_aliases() {
        let mut table = StageTable::new();
        table.declare_stage("debian:bookworm", Some("a"));
        table.declare_stage("a", Some("b"));
        table.declare_stage("B", Some("c"));
        table.declare_stage("c", None);
        assert_eq!(
            table.resolve_final("scratch").as_deref(),
            Some("debian:bookworm")
        );
    }

    #[test]
    fn alias_lookup_after_substitution() {
        let mut table = StageTable::new();
        table.declare_arg("STAGE", Some("builder"));
        table.declare_stage("golang:1.22", Some("builder"));
        table.declare_stage("${STAGE}", None);
        assert_eq!(table.resolve_final("scratch").as_deref(), Some("golang:1.22"));
    }

    #[test]
    fn cyclic_aliases_terminate() {
        let mut table = StageTable::new();
        table.declare_stage("b", Some("a"));
        table.declare_stage("a", Some("b"));
        let resolved = table.resolve_final("scratch").unwrap();
        assert!(resolved == "a" || resolved == "b");
    }

    #[test]
    fn self_referential_arg_terminates() {
        let mut table = StageTable::new();
        table.declare_arg("X", Some("${X}x"));
        table.declare_stage("${X}", None);
        assert!(table.resolve_final("scratch").is_some());
    }

    #[test]
    fn scratch_falls_back_to_previous_stage() {
        let mut table = StageTable::new();
        table.declare_stage("alpine:3.21", Some("build"));
        table.declare_stage("scratch", None);
        assert_eq!(table.resolve_final("scratch").as_deref(), Some("alpine:3.21"));
    }

    #[test]
    fn lone_scratch_stays_scratch() {
        let mut table = StageTable::new();
        table.declare_stage("scratch", None);
        assert_eq!(table.resolve_final("scratch").as_deref(), Some("scratch"));
        assert_eq!(StageTable::new().resolve_final("scratch"), None);
    }

    #[test]
    fn short_image_strips_registry_and_namespace() {
        assert_eq!(
            short_image("ghcr.io/linuxserver/baseimage-alpine:3.21"),
            "baseimage-alpine:3.21"
        );
        assert_eq!(short_image("alpine:3.21"), "alpine:3.21");
        assert_eq!(short_image(""), "");
        assert_eq!(layer_label("docker.io/library/nginx:1.27"), "nginx:1.27");
        assert_eq!(layer_label(""), "unknown");
    }

    #[test]
    fn detects_unresolved_references() {
        assert!(has_unresolved_ref("/opt/${APP}"));
        assert!(has_unresolved_ref("$HOME/x"));
        assert!(!has_unresolved_ref("price: 5$"));
        assert!(!has_unresolved_ref("plain"));
    }
}
