//! Ancestry resolution for recast.
//!
//! A recipe's base image usually has a recipe of its own. This crate follows
//! that chain: it decides when a base image is terminal, infers where a
//! parent recipe can be fetched from, fetches it through an injected
//! [`RecipeFetcher`], and merges the layers into one composite
//! [`LayerDescription`](recast_parser::LayerDescription) whose package
//! breakdown still says which layer introduced what.
//!
//! Progress is reported through [`ChainEvent`]s handed to an optional
//! observer. Resolution itself never fails; see [`ChainResolver`].

pub mod events;
pub mod fetch;
pub mod merge;
pub mod resolver;
pub mod service;
pub mod source;
pub mod terminal;

pub use events::{ChainEvent, ChainEventKind};
pub use fetch::{FetchError, FetchedRecipe, MemoryFetcher, RecipeFetcher, BRANCH_PLACEHOLDER};
pub use merge::merge_layers;
pub use resolver::{resolve_chain, ChainResolver, DEFAULT_MAX_DEPTH};
pub use service::recover_service_command;
pub use source::{
    extract_github_repo_url, infer_recipe_source, repo_url_from_template, RecipeSource,
    DEFAULT_BRANCH,
};
pub use terminal::{friendly_os, is_terminal_image};
