//! Progress records emitted while a chain resolves.

use recast_parser::LayerDescription;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainEventKind {
    Parsed,
    Fetching,
    Terminal,
    Error,
    Merged,
}

impl ChainEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Parsed => "parsed",
            Self::Fetching => "fetching",
            Self::Terminal => "terminal",
            Self::Error => "error",
            Self::Merged => "merged",
        }
    }
}

impl fmt::Display for ChainEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of chain resolution. Informational only; the resolver never
/// reads its own events back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainEvent {
    pub kind: ChainEventKind,
    /// 0 for the application layer, counting up towards the base OS.
    pub hop: usize,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub message: String,
    #[serde(default)]
    pub packages: usize,
    #[serde(default)]
    pub ports: usize,
    #[serde(default)]
    pub volumes: usize,
}

impl ChainEvent {
    pub fn new(kind: ChainEventKind, hop: usize, message: impl Into<String>) -> Self {
        Self {
            kind,
            hop,
            image: String::new(),
            url: None,
            message: message.into(),
            packages: 0,
            ports: 0,
            volumes: 0,
        }
    }

    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Running counts taken from `layer`.
    #[must_use]
    pub fn with_counts(mut self, layer: &LayerDescription) -> Self {
        self.packages = layer.packages.len();
        self.ports = layer.ports.len();
        self.volumes = layer.volumes.len();
        self
    }
}

impl fmt::Display for ChainEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}
