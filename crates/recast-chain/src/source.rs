//! Where an image's recipe lives: hosting conventions and repository URLs.

use recast_rules::RuleSet;
use serde::{Deserialize, Serialize};

const GITHUB: &str = "github.com";
const RAW_GITHUB: &str = "raw.githubusercontent.com";

/// Branch assumed for an explicit repository URL that names none.
pub const DEFAULT_BRANCH: &str = "master";

/// A fetchable recipe location: a URL template with a `{branch}` placeholder
/// and the branch to try first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeSource {
    pub template: String,
    pub branch: String,
}

/// Infer where the recipe for `repository` can be fetched from.
///
/// An explicit `https://github.com/<owner>/<repo>` URL wins; a
/// `/tree/<branch>` suffix selects the branch. Otherwise the first
/// organisation convention whose namespace appears in the image reference
/// is applied to its bare repository name (tag and digest stripped).
pub fn infer_recipe_source(
    repository: &str,
    github_url: Option<&str>,
    rules: &RuleSet,
) -> Option<RecipeSource> {
    if let Some(source) = github_url.and_then(source_from_github_url) {
        return Some(source);
    }

    let lower = repository.trim().to_lowercase();
    let convention = rules.source_for(&lower)?;
    let name = bare_name(&lower);
    if name.is_empty() {
        return None;
    }
    Some(RecipeSource {
        template: convention.template.replace("{name}", name),
        branch: convention.branch.clone(),
    })
}

fn source_from_github_url(url: &str) -> Option<RecipeSource> {
    let (host, path) = split_url(url)?;
    if host != GITHUB && host != "www.github.com" {
        return None;
    }
    let mut parts = path.split('/').filter(|p| !p.is_empty());
    let owner = parts.next()?;
    let repo = parts.next()?.trim_end_matches(".git");
    if repo.is_empty() {
        return None;
    }
    let branch = match (parts.next(), parts.next()) {
        (Some("tree"), Some(branch)) => branch,
        _ => DEFAULT_BRANCH,
    };
    Some(RecipeSource {
        template: format!("https://{RAW_GITHUB}/{owner}/{repo}/{{branch}}/Dockerfile"),
        branch: branch.to_owned(),
    })
}

/// Last path segment of an image reference, without tag or digest.
fn bare_name(image: &str) -> &str {
    let name = image.rsplit('/').next().unwrap_or(image);
    let name = name.split('@').next().unwrap_or(name);
    name.split(':').next().unwrap_or(name)
}

/// Host and path of an http(s) URL, with query and fragment removed.
fn split_url(url: &str) -> Option<(&str, &str)> {
    let rest = url
        .trim()
        .strip_prefix("https://")
        .or_else(|| url.trim().strip_prefix("http://"))?;
    let rest = rest.split(['#', '?']).next().unwrap_or(rest);
    Some(rest.split_once('/').unwrap_or((rest, "")))
}

fn owner_repo(path: &str) -> Option<(&str, &str)> {
    let mut parts = path.split('/');
    match (parts.next(), parts.next()) {
        (Some(owner), Some(repo)) if !owner.is_empty() && !repo.is_empty() => Some((owner, repo)),
        _ => None,
    }
}

/// Repository page for a raw-content template:
/// `https://raw.githubusercontent.com/o/r/{branch}/Dockerfile` gives
/// `https://github.com/o/r`.
pub fn repo_url_from_template(template: &str) -> Option<String> {
    let path = template.strip_prefix("https://raw.githubusercontent.com/")?;
    let (owner, repo) = owner_repo(path)?;
    Some(format!("https://{GITHUB}/{owner}/{repo}"))
}

/// Repository page for any GitHub page or raw-content URL.
pub fn extract_github_repo_url(url: &str) -> Option<String> {
    let (host, path) = split_url(url)?;
    match host {
        GITHUB | "www.github.com" | RAW_GITHUB => {
            let (owner, repo) = owner_repo(path)?;
            let repo = repo.trim_end_matches(".git");
            (!repo.is_empty()).then(|| format!("https://{GITHUB}/{owner}/{repo}"))
        }
        _ => None,
    }
}
