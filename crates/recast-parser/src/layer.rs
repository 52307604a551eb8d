use crate::types::{LayerLabel, OsFamily};
use recast_rules::{StartupRules, UNKNOWN_KIND};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Everything recovered from one recipe, or the composite of a resolved chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerDescription {
    /// Resolved base image reference.
    pub base_image: String,
    pub base_os: OsFamily,
    pub packages: Vec<String>,
    /// Provenance of `packages`: which layer first introduced each name.
    #[serde(default)]
    pub package_layers: Vec<PackageLayer>,
    #[serde(default)]
    pub interpreter_packages: Vec<String>,
    #[serde(default)]
    pub interpreter_package_layers: Vec<PackageLayer>,
    #[serde(default)]
    pub ports: Vec<String>,
    #[serde(default)]
    pub volumes: Vec<String>,
    #[serde(default)]
    pub env: Vec<EnvVar>,
    #[serde(default)]
    pub signing_keys: Vec<SigningKey>,
    #[serde(default)]
    pub repositories: Vec<RepoSource>,
    #[serde(default)]
    pub copies: Vec<CopyAction>,
    #[serde(default)]
    pub directories: Vec<String>,
    #[serde(default)]
    pub downloads: Vec<DownloadAction>,
    #[serde(default)]
    pub symlinks: Vec<SymlinkAction>,
    #[serde(default)]
    pub accounts: Vec<String>,
    #[serde(default)]
    pub actions: Vec<ShellAction>,
    #[serde(default)]
    pub startup: StartupIntent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageLayer {
    pub label: LayerLabel,
    pub packages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub key: String,
    pub default: String,
}

/// A signing key fetched from `url` and installed at `keyring`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningKey {
    pub url: String,
    pub keyring: String,
}

/// A third-party repository source line written to `file`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoSource {
    pub line: String,
    pub file: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyAction {
    pub src: String,
    pub dest: String,
    /// Build stage the files come from (`COPY --from=<stage>`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_stage: Option<String>,
    /// Source is fetched over the network rather than read from the build context.
    #[serde(default)]
    pub is_url: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DownloadAction {
    pub url: String,
    pub dest: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymlinkAction {
    pub target: String,
    pub link: String,
}

/// Candidate startup commands, in precedence order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartupIntent {
    /// Foreground service command recovered from an init helper script.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

impl StartupIntent {
    pub fn is_empty(&self) -> bool {
        self.service_command.is_none() && self.entrypoint.is_none() && self.command.is_none()
    }
}

/// Kind of a classified shell sub-command.
///
/// Serialises as a plain string; kinds from the generic command-type table
/// round-trip through [`ActionKind::Generic`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionKind {
    Mkdir,
    Account,
    Download,
    Symlink,
    Chmod,
    Chown,
    Sed,
    GitClone,
    Generic(String),
    Unknown,
}

impl ActionKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Mkdir => "mkdir",
            Self::Account => "useradd",
            Self::Download => "download",
            Self::Symlink => "symlink",
            Self::Chmod => "chmod",
            Self::Chown => "chown",
            Self::Sed => "sed",
            Self::GitClone => "git_clone",
            Self::Generic(kind) => kind,
            Self::Unknown => UNKNOWN_KIND,
        }
    }

    /// Whether an ancestor layer's action of this kind survives a merge.
    ///
    /// Unrecognised sub-commands and source clones in ancestors are build
    /// machinery of the original image.
    pub fn is_actionable(&self) -> bool {
        !matches!(self, Self::Unknown | Self::GitClone)
    }
}

impl From<String> for ActionKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "mkdir" => Self::Mkdir,
            "useradd" => Self::Account,
            "download" => Self::Download,
            "symlink" => Self::Symlink,
            "chmod" => Self::Chmod,
            "chown" => Self::Chown,
            "sed" => Self::Sed,
            "git_clone" => Self::GitClone,
            UNKNOWN_KIND => Self::Unknown,
            _ => Self::Generic(s),
        }
    }
}

impl From<&str> for ActionKind {
    fn from(s: &str) -> Self {
        Self::from(s.to_owned())
    }
}

impl From<ActionKind> for String {
    fn from(kind: ActionKind) -> Self {
        match kind {
            ActionKind::Generic(s) => s,
            other => other.as_str().to_owned(),
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One classified shell sub-command with its original text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellAction {
    pub kind: ActionKind,
    pub original: String,
}

impl ShellAction {
    pub fn new(kind: ActionKind, original: impl Into<String>) -> Self {
        Self {
            kind,
            original: original.into(),
        }
    }
}

impl LayerDescription {
    /// The command that should run as the service, by precedence: service
    /// command, entry point, default command. Container init wrappers are
    /// skipped.
    pub fn startup_command(&self, rules: &StartupRules) -> Option<&str> {
        [
            self.startup.service_command.as_deref(),
            self.startup.entrypoint.as_deref(),
            self.startup.command.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|cmd| !cmd.is_empty() && !rules.is_init(cmd))
    }

    /// A copy of this description with the service command set.
    #[must_use]
    pub fn with_service_command(mut self, cmd: impl Into<String>) -> Self {
        let cmd = cmd.into();
        self.startup.service_command = if cmd.trim().is_empty() {
            None
        } else {
            Some(cmd)
        };
        self
    }

    /// A copy of this description with the origin repository set.
    #[must_use]
    pub fn with_repo_url(mut self, url: impl Into<String>) -> Self {
        self.repo_url = Some(url.into());
        self
    }

    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.default.as_str())
    }

    /// Actions nothing recognised, for human review.
    pub fn unrecognized_actions(&self) -> impl Iterator<Item = &ShellAction> {
        self.actions.iter().filter(|a| a.kind == ActionKind::Unknown)
    }
}
