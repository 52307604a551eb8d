//! Named transient package groups (`apk add --virtual NAME ...` / `apk del NAME`).

use super::packages::{apk_add_args, native_install};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

static APK_DEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bapk\s+(?:-\S+\s+)*del\b(.*)$").expect("valid apk del pattern")
});

/// Group creations and deletions observed during one parse.
///
/// Exclusion is computed after the whole recipe is scanned, since a group can
/// be deleted arbitrarily later than it was created.
#[derive(Debug, Default)]
pub struct GroupTracker {
    members: HashMap<String, Vec<String>>,
    deleted: HashSet<String>,
}

impl GroupTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record any group creation or deletion in a sub-command.
    pub fn observe(&mut self, cmd: &str) {
        if let Some(name) = virtual_group_name(cmd) {
            let pkgs = native_install(cmd).map(|(_, p)| p).unwrap_or_default();
            tracing::trace!(group = %name, members = pkgs.len(), "package group created");
            self.members.entry(name).or_default().extend(pkgs);
        }
        if let Some(caps) = APK_DEL.captures(cmd) {
            let rest = caps.get(1).map_or("", |m| m.as_str());
            for word in rest.split_whitespace() {
                if matches!(word, "&&" | "||" | ";" | "|") || word.starts_with('#') {
                    break;
                }
                if word.starts_with('-') || word.starts_with('$') {
                    continue;
                }
                self.deleted.insert(word.to_owned());
            }
        }
    }

    /// Packages belonging to any group that was later deleted.
    pub fn excluded(&self) -> HashSet<&str> {
        self.deleted
            .iter()
            .filter_map(|name| self.members.get(name))
            .flatten()
            .map(String::as_str)
            .collect()
    }
}

fn virtual_group_name(cmd: &str) -> Option<String> {
    let args = apk_add_args(cmd)?;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if let Some(name) = arg.strip_prefix("--virtual=") {
            return Some(name.to_owned());
        }
        if matches!(*arg, "--virtual" | "-t") {
            return iter.next().map(|n| (*n).to_owned());
        }
    }
    None
}
