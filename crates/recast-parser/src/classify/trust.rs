//! Signing-key and third-party repository extraction.

use crate::layer::{RepoSource, SigningKey};
use regex::Regex;
use std::sync::LazyLock;

/// `curl URL | gpg --dearmor | tee DEST`
static KEY_DEARMOR_TEE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"curl\s+[^|]*?(https?://\S+\.(?:asc|gpg\.key|gpg|key))\s*\|\s*gpg\s+--dearmor\s*\|\s*(?:sudo\s+)?tee\s+(/\S+)",
    )
    .expect("valid key pattern")
});

/// `curl|wget URL | gpg --dearmor > DEST` or `... --dearmor -o DEST`
static KEY_DEARMOR_REDIRECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:wget|curl)\s+[^|]*?(https?://\S+\.(?:asc|gpg\.key|gpg|key))\s*\|\s*gpg\s+--dearmor\s*(?:>|-o)\s*(/\S+)",
    )
    .expect("valid key pattern")
});

/// `curl URL > DEST` or `curl URL | tee DEST`
static KEY_DIRECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"curl\s+[^|]*?(https?://\S+\.(?:asc|gpg\.key|gpg|key))\s*[|>]\s*(?:tee\s+|gpg\s+--dearmor\s*(?:-o|>)\s*)?(/\S+)",
    )
    .expect("valid key pattern")
});

static REPO_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"echo\s+["'](deb\s+.+?)["']\s*(?:>>?|\|\s*(?:sudo\s+)?tee(?:\s+-a)?)\s*(/etc/apt/sources\.list\.d/\S+)"#,
    )
    .expect("valid repository pattern")
});

/// A signing-key fetch-then-install pipeline in one sub-command.
///
/// The pipeline forms are tried from most to least specific so the decoded
/// destination wins over an intermediate one.
pub fn signing_key(cmd: &str) -> Option<SigningKey> {
    [&*KEY_DEARMOR_TEE, &*KEY_DEARMOR_REDIRECT, &*KEY_DIRECT]
        .into_iter()
        .find_map(|re| re.captures(cmd))
        .map(|caps| SigningKey {
            url: caps[1].to_owned(),
            keyring: caps[2].to_owned(),
        })
}

/// A third-party repository line written to the sources directory.
pub fn repository(cmd: &str) -> Option<RepoSource> {
    REPO_LINE.captures(cmd).map(|caps| RepoSource {
        line: caps[1].trim().to_owned(),
        file: caps[2].to_owned(),
    })
}
