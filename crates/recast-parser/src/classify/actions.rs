//! Generic categorisation of sub-commands no dedicated extractor consumed.

use super::packages::is_package_command;
use super::trust;
use crate::layer::{ActionKind, DownloadAction, ShellAction, SymlinkAction};
use crate::lexer::split_words;
use recast_rules::RuleSet;
use regex::Regex;
use std::sync::LazyLock;

static BANNER_ECHO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^echo\s+(?:-e\s+)?["']?(?:\*{3,}|={3,}|-{3,}|#{3,})"#).expect("valid banner pattern")
});

static VERSION_PRINTF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)^(?:printf|echo)\s+.*\b(?:build[-_ ]?version|version)\b.*>\s*/\S*(?:version|release)\S*"#)
        .expect("valid version printf pattern")
});

static LEADING_ASSIGNMENTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[A-Za-z_][A-Za-z0-9_]*=\S*\s+)+").expect("valid assignment pattern")
});

static CURL_FLAG_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^curl\s+(?:.*?\s)?(?:-[a-zA-Z]*o|--output)(?:\s+|=)(\S+)\s+(?:.*?\s)?["']?(https?://[^\s"']+)"#)
        .expect("valid curl pattern")
});

static CURL_URL_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^curl\s+(?:.*?\s)?["']?(https?://[^\s"']+)["']?\s+(?:.*?\s)?(?:-[a-zA-Z]*o|--output)(?:\s+|=)(\S+)"#)
        .expect("valid curl pattern")
});

static WGET_FLAG_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^wget\s+(?:.*?\s)?(?:-[a-zA-Z]*O|--output-document)(?:\s+|=)(\S+)\s+(?:.*?\s)?["']?(https?://[^\s"']+)"#)
        .expect("valid wget pattern")
});

static WGET_URL_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^wget\s+(?:.*?\s)?["']?(https?://[^\s"']+)["']?\s+(?:.*?\s)?(?:-[a-zA-Z]*O|--output-document)(?:\s+|=)(\S+)"#)
        .expect("valid wget pattern")
});

static GIT_CLONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^git\s+(?:-\S+\s+)*clone\s").expect("valid git pattern"));

/// Flags of `useradd`/`adduser` that consume the following word.
const ACCOUNT_VALUE_FLAGS: &[&str] = &[
    "-u", "-g", "-G", "-d", "-h", "-s", "-c", "-k", "-e", "-f", "-p", "-K", "-b",
    "--uid", "--gid", "--groups", "--home", "--home-dir", "--shell", "--comment",
    "--gecos", "--ingroup", "--skel", "--base-dir", "--password",
];

/// What a categorised sub-command contributes beyond its action entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Directories(Vec<String>),
    Account(String),
    Download(DownloadAction),
    Symlink(SymlinkAction),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Categorized {
    pub action: ShellAction,
    pub effect: Option<Effect>,
}

impl Categorized {
    fn plain(kind: ActionKind, cmd: &str) -> Self {
        Self {
            action: ShellAction::new(kind, cmd),
            effect: None,
        }
    }

    fn with_effect(kind: ActionKind, cmd: &str, effect: Effect) -> Self {
        Self {
            action: ShellAction::new(kind, cmd),
            effect: Some(effect),
        }
    }
}

/// Categorise one sub-command.
///
/// Returns `None` for shell noise, for sub-commands a dedicated extractor
/// already handled, and for relative-path cleanup. Everything else yields an
/// action, falling through to [`ActionKind::Unknown`].
pub fn categorize(cmd: &str, rules: &RuleSet) -> Option<Categorized> {
    let cmd = cmd.trim();
    if cmd.is_empty() || is_noise(cmd, rules) || is_handled(cmd) {
        return None;
    }
    let unassigned = LEADING_ASSIGNMENTS.replace(cmd, "");
    let bare = unassigned
        .strip_prefix("sudo ")
        .map_or(&*unassigned, str::trim_start);

    if let Some(rest) = command_args(bare, &["mkdir"]) {
        let dirs = mkdir_targets(rest);
        return Some(Categorized::with_effect(
            ActionKind::Mkdir,
            cmd,
            Effect::Directories(dirs),
        ));
    }
    if let Some(rest) = command_args(bare, &["useradd", "adduser"]) {
        return Some(match account_name(rest) {
            Some(name) => Categorized::with_effect(ActionKind::Account, cmd, Effect::Account(name)),
            None => Categorized::plain(ActionKind::Account, cmd),
        });
    }
    if command_args(bare, &["groupadd", "addgroup"]).is_some() {
        return Some(Categorized::plain(ActionKind::Account, cmd));
    }
    if let Some(download) = download(bare) {
        return Some(Categorized::with_effect(
            ActionKind::Download,
            cmd,
            Effect::Download(download),
        ));
    }
    if let Some(rest) = command_args(bare, &["ln"]) {
        if let Some(link) = symlink(rest) {
            return Some(Categorized::with_effect(
                ActionKind::Symlink,
                cmd,
                Effect::Symlink(link),
            ));
        }
    }
    if command_args(bare, &["chmod"]).is_some() {
        return Some(Categorized::plain(ActionKind::Chmod, cmd));
    }
    if command_args(bare, &["chown"]).is_some() {
        return Some(Categorized::plain(ActionKind::Chown, cmd));
    }
    if command_args(bare, &["sed"]).is_some() {
        return Some(Categorized::plain(ActionKind::Sed, cmd));
    }
    if GIT_CLONE.is_match(bare) {
        return Some(Categorized::plain(ActionKind::GitClone, cmd));
    }
    if let Some(rest) = command_args(bare, &["rm"]) {
        if is_relative_cleanup(rest) {
            tracing::trace!(cmd, "dropping relative cleanup");
            return None;
        }
    }
    if let Some(kind) = rules.command_kind(bare) {
        return Some(Categorized::plain(ActionKind::from(kind), cmd));
    }
    Some(Categorized::plain(ActionKind::Unknown, cmd))
}

/// Shell noise: table-driven matches, banner echoes, version stamps.
pub fn is_noise(cmd: &str, rules: &RuleSet) -> bool {
    rules.noise.matches(cmd) || BANNER_ECHO.is_match(cmd) || VERSION_PRINTF.is_match(cmd)
}

/// Sub-commands a dedicated extractor consumes.
fn is_handled(cmd: &str) -> bool {
    let stripped = LEADING_ASSIGNMENTS.replace(cmd, "");
    let stripped = stripped.strip_prefix("sudo ").unwrap_or(&stripped);
    let first = stripped.split_whitespace().next().unwrap_or("");
    matches!(first.rsplit('/').next(), Some("apt-get" | "apt" | "apk"))
        || is_package_command(cmd)
        || trust::signing_key(cmd).is_some()
        || trust::repository(cmd).is_some()
}

/// The argument text when `cmd` invokes one of `names`.
fn command_args<'a>(cmd: &'a str, names: &[&str]) -> Option<&'a str> {
    let (head, rest) = cmd.split_once(char::is_whitespace).unwrap_or((cmd, ""));
    names.contains(&head).then_some(rest)
}

fn mkdir_targets(rest: &str) -> Vec<String> {
    let mut dirs = Vec::new();
    let mut skip_next = false;
    for word in split_words(rest) {
        if skip_next {
            skip_next = false;
            continue;
        }
        if word.starts_with('-') {
            skip_next = matches!(word.as_str(), "-m" | "--mode");
            continue;
        }
        if word.starts_with('/') {
            dirs.push(word);
        }
    }
    dirs
}

fn account_name(rest: &str) -> Option<String> {
    let mut skip_next = false;
    for word in split_words(rest) {
        if matches!(word.as_str(), "&&" | "||" | "|" | ";") {
            break;
        }
        if skip_next {
            skip_next = false;
            continue;
        }
        if word.starts_with('-') {
            skip_next = !word.contains('=') && ACCOUNT_VALUE_FLAGS.contains(&word.as_str());
            continue;
        }
        if word.starts_with('$') {
            return None;
        }
        return Some(word);
    }
    None
}

fn download(cmd: &str) -> Option<DownloadAction> {
    let by_flag = [&*CURL_FLAG_FIRST, &*WGET_FLAG_FIRST]
        .into_iter()
        .find_map(|re| re.captures(cmd))
        .map(|c| (c[2].to_owned(), c[1].to_owned()));
    let by_url = || {
        [&*CURL_URL_FIRST, &*WGET_URL_FIRST]
            .into_iter()
            .find_map(|re| re.captures(cmd))
            .map(|c| (c[1].to_owned(), c[2].to_owned()))
    };
    let (url, dest) = by_flag.or_else(by_url)?;
    let dest = dest.trim_matches(|c| c == '"' || c == '\'').to_owned();
    // `-o -` writes to stdout, the body is consumed by the pipeline
    if dest == "-" || dest.is_empty() {
        return None;
    }
    Some(DownloadAction { url, dest })
}

fn symlink(rest: &str) -> Option<SymlinkAction> {
    let words = split_words(rest);
    let symbolic = words
        .iter()
        .any(|w| w == "--symbolic" || (w.starts_with('-') && !w.starts_with("--") && w.contains('s')));
    if !symbolic {
        return None;
    }
    let positional: Vec<&String> = words.iter().filter(|w| !w.starts_with('-')).collect();
    match positional.as_slice() {
        [target, .., link] => Some(SymlinkAction {
            target: (*target).clone(),
            link: (*link).clone(),
        }),
        _ => None,
    }
}

fn is_relative_cleanup(rest: &str) -> bool {
    split_words(rest)
        .iter()
        .filter(|w| !w.starts_with('-'))
        .all(|w| !(w.starts_with('/') || w.starts_with('$') || w.starts_with('~')))
}
