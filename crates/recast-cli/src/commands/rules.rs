use super::{json_pretty, EXIT_SUCCESS};
use std::path::Path;

pub fn run(check: Option<&Path>, json: bool) -> Result<u8, String> {
    let Some(path) = check else {
        let rules = recast_rules::active();
        if json {
            println!("{}", json_pretty(rules)?);
        } else {
            let text = toml::to_string_pretty(rules)
                .map_err(|e| format!("TOML serialization failed: {e}"))?;
            print!("{text}");
        }
        return Ok(EXIT_SUCCESS);
    };

    let rules = recast_rules::parse_rules_file(path)
        .map_err(|e| format!("rules error: {}: {e}", path.display()))?;
    if json {
        let value = serde_json::json!({
            "path": path.display().to_string(),
            "valid": true,
            "os_profiles": rules.os.len(),
            "command_types": rules.command_types.len(),
            "sources": rules.sources.len(),
        });
        println!("{}", json_pretty(&value)?);
    } else {
        println!(
            "{}: ok ({} os profiles, {} command types, {} source conventions)",
            path.display(),
            rules.os.len(),
            rules.command_types.len(),
            rules.sources.len()
        );
    }
    Ok(EXIT_SUCCESS)
}
