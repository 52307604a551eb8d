use super::{json_pretty, print_layer, read_recipe, EXIT_SUCCESS};
use std::path::Path;

pub fn run(recipe: &Path, json: bool) -> Result<u8, String> {
    let content = read_recipe(recipe)?;
    let rules = recast_rules::active();
    let layer = recast_parser::parse_dockerfile_with(&content, rules);
    if json {
        println!("{}", json_pretty(&layer)?);
    } else {
        print_layer(&layer, rules);
    }
    Ok(EXIT_SUCCESS)
}
