//! Terminal base images: where ancestry resolution stops.

use recast_parser::{short_image, LayerDescription};
use recast_rules::{RuleSet, TerminalRules};

/// True when `image` has no fetchable ancestry.
///
/// That is the empty-filesystem sentinel, anything under a terminal registry
/// namespace, or an image without a registry domain whose bare repository
/// name is on the allow-list. An image with a registry domain is never
/// terminal outside the listed namespaces.
pub fn is_terminal_image(image: &str, rules: &TerminalRules) -> bool {
    let img = image.trim().to_lowercase();
    if img.is_empty() {
        return false;
    }
    if img == rules.sentinel {
        return true;
    }
    if rules
        .namespaces
        .iter()
        .any(|ns| !ns.is_empty() && img.starts_with(ns.as_str()))
    {
        return true;
    }

    if let Some((first, _)) = img.split_once('/') {
        if first.contains('.') || first.contains(':') || first == "localhost" {
            return false;
        }
    }

    let repo = img.split('@').next().unwrap_or(&img);
    let repo = repo.split(':').next().unwrap_or(repo);
    let repo = repo.strip_prefix("library/").unwrap_or(repo);
    !repo.contains('/') && rules.names.iter().any(|n| n == repo)
}

/// Display name of the OS a layer is built on, for progress messages.
pub fn friendly_os(layer: &LayerDescription, rules: &RuleSet) -> String {
    if !layer.base_os.is_unknown() {
        if let Some(profile) = rules.profile(&layer.base_os) {
            return profile.display_name.clone();
        }
    }
    let short = short_image(&layer.base_image);
    if short.is_empty() || short.eq_ignore_ascii_case(&rules.terminal.sentinel) {
        return "Base OS".to_owned();
    }
    let mut chars = short.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => "Unknown".to_owned(),
    }
}
