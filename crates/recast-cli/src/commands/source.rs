use super::{json_pretty, EXIT_SUCCESS};
use recast_chain::{infer_recipe_source, repo_url_from_template};

pub fn run(image: Option<&str>, github: Option<&str>, json: bool) -> Result<u8, String> {
    if image.is_none() && github.is_none() {
        return Err("pass --image or --github".to_owned());
    }
    let image = image.unwrap_or("");
    let source = infer_recipe_source(image, github, recast_rules::active())
        .ok_or_else(|| format!("cannot resolve recipe URL for {}", github.unwrap_or(image)))?;
    let repo_url = repo_url_from_template(&source.template);

    if json {
        let value = serde_json::json!({
            "template": source.template,
            "branch": source.branch,
            "repo_url": repo_url,
        });
        println!("{}", json_pretty(&value)?);
    } else {
        println!("template: {}", source.template);
        println!("branch:   {}", source.branch);
        if let Some(url) = repo_url {
            println!("repo_url: {url}");
        }
    }
    Ok(EXIT_SUCCESS)
}
