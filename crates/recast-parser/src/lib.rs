//! Single-layer Dockerfile parsing for recast.
//!
//! This crate turns one recipe's text into a [`LayerDescription`]: native and
//! interpreter packages with per-layer provenance, signing keys and repository
//! lines, exposed ports and volumes, filtered environment, filesystem actions,
//! classified shell actions and startup candidates. Parsing is best-effort and
//! infallible; nothing here performs I/O.
//!
//! Classification data comes from `recast-rules`. [`parse_dockerfile`] uses the
//! process-wide tables, [`parse_dockerfile_with`] an explicit set.

pub mod classify;
pub mod dockerfile;
pub mod image;
pub mod layer;
pub mod lexer;
pub mod startup;
pub mod types;

pub use dockerfile::{parse_dockerfile, parse_dockerfile_with};
pub use image::{layer_label, short_image, StageTable};
pub use layer::{
    ActionKind, CopyAction, DownloadAction, EnvVar, LayerDescription, PackageLayer, RepoSource,
    ShellAction, SigningKey, StartupIntent, SymlinkAction,
};
pub use startup::{infer_init_script_url, kebab_case, parse_init_script};
pub use types::{LayerLabel, OsFamily};
