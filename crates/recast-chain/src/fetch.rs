//! The fetch capability the resolver is handed.

use std::collections::HashMap;
use thiserror::Error;

/// Placeholder a source template carries for the branch name.
pub const BRANCH_PLACEHOLDER: &str = "{branch}";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("transport error: {0}")]
    Transport(String),
}

/// Text returned by a fetcher, with the URL it was actually read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedRecipe {
    pub content: String,
    pub url: String,
}

/// Retrieves the text behind a source template.
///
/// `template` carries a [`BRANCH_PLACEHOLDER`]; substituting it (and trying
/// other branches) is up to the implementation. Any timeout policy belongs
/// here too: the resolver blocks on this call.
pub trait RecipeFetcher {
    fn fetch_recipe(&self, template: &str, branch: &str) -> Result<FetchedRecipe, FetchError>;
}

impl<F: RecipeFetcher + ?Sized> RecipeFetcher for &F {
    fn fetch_recipe(&self, template: &str, branch: &str) -> Result<FetchedRecipe, FetchError> {
        (**self).fetch_recipe(template, branch)
    }
}

/// Fetcher backed by a map from template to content. Never touches the network.
#[derive(Debug, Default, Clone)]
pub struct MemoryFetcher {
    files: HashMap<String, String>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, template: impl Into<String>, content: impl Into<String>) -> Self {
        self.insert(template, content);
        self
    }

    pub fn insert(&mut self, template: impl Into<String>, content: impl Into<String>) {
        self.files.insert(template.into(), content.into());
    }
}

impl RecipeFetcher for MemoryFetcher {
    fn fetch_recipe(&self, template: &str, branch: &str) -> Result<FetchedRecipe, FetchError> {
        let url = template.replacen(BRANCH_PLACEHOLDER, branch, 1);
        self.files
            .get(template)
            .map(|content| FetchedRecipe {
                content: content.clone(),
                url: url.clone(),
            })
            .ok_or(FetchError::NotFound(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_fetcher_substitutes_branch_in_reported_url() {
        let fetcher = MemoryFetcher::new().with("https://x/{branch}/Dockerfile", "FROM alpine\n");
        let fetched = fetcher
            .fetch_recipe("https://x/{branch}/Dockerfile", "master")
            .unwrap();
        assert_eq!(fetched.content, "FROM alpine\n");
        assert_eq!(fetched.url, "https://x/master/Dockerfile");
    }

    #[test]
    fn memory_fetcher_missing_template() {
        let fetcher = MemoryFetcher::new();
        let err = fetcher.fetch_recipe("https://y/{branch}/Dockerfile", "main").unwrap_err();
        assert_eq!(err, FetchError::NotFound("https://y/main/Dockerfile".to_owned()));
        assert_eq!(err.to_string(), "not found: https://y/main/Dockerfile");
    }

    #[test]
    fn references_are_fetchers() {
        fn fetch_via(f: impl RecipeFetcher) -> Result<FetchedRecipe, FetchError> {
            f.fetch_recipe("t/{branch}", "b")
        }
        let fetcher = MemoryFetcher::new().with("t/{branch}", "x");
        assert_eq!(fetch_via(&fetcher).unwrap().url, "t/b");
    }
}
