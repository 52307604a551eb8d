//! Native and interpreter package-install extraction.

use regex::Regex;
use std::sync::LazyLock;

static APT_INSTALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bapt(?:-get)?\s+(?:-\S+\s+)*install\b(.*)$").expect("valid apt pattern")
});

static APK_ADD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bapk\s+(?:-\S+\s+)*add\b(.*)$").expect("valid apk pattern")
});

static PIP_INSTALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[\s/])(?:pip3?|python3?(?:\.\d+)?\s+-m\s+pip)\s+(?:-\S+\s+)*install\b(.*)$")
        .expect("valid pip pattern")
});

/// Flags of `apt-get install` that consume the following word.
const APT_VALUE_FLAGS: &[&str] = &["-o", "-t", "-c", "--target-release", "--option", "--config-file"];

/// Flags of `apk add` that consume the following word.
const APK_VALUE_FLAGS: &[&str] = &[
    "-t",
    "--virtual",
    "-X",
    "--repository",
    "-p",
    "--root",
    "--arch",
    "--keys-dir",
    "--repositories-file",
];

/// Flags of `pip install` that consume the following word.
const PIP_VALUE_FLAGS: &[&str] = &[
    "-r",
    "--requirement",
    "-c",
    "--constraint",
    "-e",
    "--editable",
    "-i",
    "--index-url",
    "--extra-index-url",
    "-f",
    "--find-links",
    "-t",
    "--target",
    "--prefix",
    "--root",
    "--src",
    "--trusted-host",
    "--cache-dir",
    "--platform",
    "--python-version",
    "--implementation",
    "--abi",
    "--only-binary",
    "--no-binary",
    "--progress-bar",
    "--log",
    "--upgrade-strategy",
];

/// Which native package manager an install sub-command uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Apt,
    Apk,
}

/// Packages named by a native install sub-command, with the manager used.
pub fn native_install(cmd: &str) -> Option<(PackageManager, Vec<String>)> {
    if let Some(caps) = APT_INSTALL.captures(cmd) {
        let rest = caps.get(1).map_or("", |m| m.as_str());
        return Some((PackageManager::Apt, native_names(rest, APT_VALUE_FLAGS)));
    }
    if let Some(caps) = APK_ADD.captures(cmd) {
        let rest = caps.get(1).map_or("", |m| m.as_str());
        return Some((PackageManager::Apk, native_names(rest, APK_VALUE_FLAGS)));
    }
    None
}

/// The argument words of an `apk add` sub-command, flags included.
pub(crate) fn apk_add_args(cmd: &str) -> Option<Vec<&str>> {
    let caps = APK_ADD.captures(cmd)?;
    let rest = caps.get(1).map_or("", |m| m.as_str());
    Some(words_until_separator(rest).collect())
}

/// Packages named by an interpreter-ecosystem install sub-command.
pub fn interpreter_install(cmd: &str) -> Option<Vec<String>> {
    let caps = PIP_INSTALL.captures(cmd)?;
    let rest = caps.get(1).map_or("", |m| m.as_str());
    let mut names = Vec::new();
    let mut skip_next = false;
    for word in words_until_separator(rest) {
        if skip_next {
            skip_next = false;
            continue;
        }
        if word.starts_with('-') {
            skip_next = PIP_VALUE_FLAGS.contains(&word);
            continue;
        }
        let word = trim_quotes(word);
        if word.is_empty() || word.starts_with('$') || is_pip_non_package(word) {
            continue;
        }
        let name = strip_version(word, &['=', '<', '>', '!', '~', ';', '@']);
        if !name.is_empty() {
            names.push(name.to_owned());
        }
    }
    Some(names)
}

/// True when the sub-command is handled by one of the package extractors.
pub fn is_package_command(cmd: &str) -> bool {
    APT_INSTALL.is_match(cmd) || APK_ADD.is_match(cmd) || PIP_INSTALL.is_match(cmd)
}

fn native_names(rest: &str, value_flags: &[&str]) -> Vec<String> {
    let mut names = Vec::new();
    let mut skip_next = false;
    for word in words_until_separator(rest) {
        if skip_next {
            skip_next = false;
            continue;
        }
        if word.starts_with('-') {
            skip_next = value_flags.contains(&word);
            continue;
        }
        let word = trim_quotes(word);
        if word.is_empty() || word.starts_with('$') || is_local_archive(word) {
            continue;
        }
        let name = strip_version(word, &['=', '<', '>', '~']);
        // apt release pin: pkg/bookworm-backports
        let name = name.split('/').next().unwrap_or(name);
        if !name.is_empty() {
            names.push(name.to_owned());
        }
    }
    names
}

/// Whitespace-separated words up to the first shell separator, redirect or comment.
fn words_until_separator(rest: &str) -> impl Iterator<Item = &str> {
    rest.split_whitespace().take_while(|w| {
        !matches!(*w, "&&" | "||" | ";" | "|" | "\\")
            && !w.starts_with('#')
            && !w.starts_with('>')
            && !w.starts_with("2>")
            && !w.starts_with("&>")
    })
}

fn trim_quotes(word: &str) -> &str {
    word.trim_matches(|c| c == '"' || c == '\'')
}

fn strip_version<'a>(word: &'a str, markers: &[char]) -> &'a str {
    word.find(markers).map_or(word, |idx| &word[..idx])
}

fn is_local_archive(word: &str) -> bool {
    word.starts_with('/')
        || word.starts_with("./")
        || word.starts_with("../")
        || word.ends_with(".deb")
        || word.ends_with(".apk")
}

fn is_pip_non_package(word: &str) -> bool {
    word == "."
        || word.contains("://")
        || word.starts_with("git+")
        || word.starts_with('/')
        || word.starts_with("./")
        || word.starts_with("../")
        || [".whl", ".tar.gz", ".zip", ".txt"]
            .iter()
            .any(|ext| word.ends_with(ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(cmd: &str) -> Vec<String> {
        native_install(cmd).map(|(_, n)| n).unwrap_or_default()
    }

    #[test]
    fn apt_get_install_with_flags() {
        assert_eq!(
            names("apt-get install -y --no-install-recommends curl ca-certificates"),
            vec!["curl", "ca-certificates"]
        );
        assert_eq!(
            native_install("apt-get -qq install git").map(|(m, _)| m),
            Some(PackageManager::Apt)
        );
    }

    #[test]
    fn apt_with_env_prefix_and_version_pins() {
        assert_eq!(
            names("DEBIAN_FRONTEND=noninteractive apt install -y nginx=1.22.1-9 libssl3>=3.0"),
            vec!["nginx", "libssl3"]
        );
    }

    #[test]
    fn apt_value_flags_skip_their_argument() {
        assert_eq!(
            names("apt-get install -y -t bookworm-backports -o Dpkg::Options::=--force-confold podman"),
            vec!["podman"]
        );
        assert_eq!(names("apt-get install -y cockpit/bookworm-backports"), vec!["cockpit"]);
    }

    #[test]
    fn apk_add_stops_at_separator_and_skips_vars() {
        assert_eq!(
            names("apk add --no-cache bash $EXTRA_PKGS curl | tee log"),
            vec!["bash", "curl"]
        );
        assert_eq!(names("apk add --no-cache jq # tooling"), vec!["jq"]);
    }

    #[test]
    fn apk_virtual_group_name_is_not_a_package() {
        assert_eq!(
            names("apk add --no-cache --virtual=build-deps gcc musl-dev"),
            vec!["gcc", "musl-dev"]
        );
        assert_eq!(
            names("apk add --no-cache --virtual .build-deps gcc"),
            vec!["gcc"]
        );
        assert_eq!(names("apk add -t build-deps make"), vec!["make"]);
    }

    #[test]
    fn local_archives_are_skipped() {
        assert_eq!(
            names("apt-get install -y /tmp/app.deb ./other.deb tini"),
            vec!["tini"]
        );
        assert_eq!(names("apk add --allow-untrusted pkg.apk"), Vec::<String>::new());
    }

    #[test]
    fn redirects_end_the_package_list() {
        assert_eq!(names("apt-get install -y git >/dev/null 2>&1"), vec!["git"]);
    }

    #[test]
    fn non_install_commands_do_not_match() {
        assert!(native_install("apt-get update").is_none());
        assert!(native_install("apk del build-deps").is_none());
        assert!(native_install("echo apkadd").is_none());
    }

    #[test]
    fn pip_install_skips_value_flags_and_files() {
        assert_eq!(
            interpreter_install("pip3 install --no-cache-dir -r requirements.txt -U flask==3.0 'gunicorn>=21'"),
            Some(vec!["flask".to_owned(), "gunicorn".to_owned()])
        );
        assert_eq!(
            interpreter_install(
                "python3 -m pip install --index-url https://pypi.example/simple -e . requests"
            ),
            Some(vec!["requests".to_owned()])
        );
        assert_eq!(
            interpreter_install("pip install --find-links=/wheels /wheels/x.whl git+https://g/x.git six"),
            Some(vec!["six".to_owned()])
        );
    }

    #[test]
    fn pip_extras_keep_their_brackets() {
        assert_eq!(
            interpreter_install("pip install 'uvicorn[standard]~=0.30' \"psycopg[binary]\""),
            Some(vec!["uvicorn[standard]".to_owned(), "psycopg[binary]".to_owned()])
        );
    }

    #[test]
    fn pip_from_venv_path() {
        assert_eq!(
            interpreter_install("/opt/venv/bin/pip install wheel"),
            Some(vec!["wheel".to_owned()])
        );
        assert!(interpreter_install("pipx install poetry").is_none());
        assert!(interpreter_install("pip freeze").is_none());
    }

    #[test]
    fn package_command_detection() {
        assert!(is_package_command("apk add curl"));
        assert!(is_package_command("apt-get -y install curl"));
        assert!(is_package_command("pip install x"));
        assert!(!is_package_command("apk update"));
    }
}
