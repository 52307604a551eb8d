use super::{json_pretty, EXIT_SUCCESS};
use recast_chain::is_terminal_image;

pub fn run(image: &str, json: bool) -> Result<u8, String> {
    let rules = recast_rules::active();
    let terminal = is_terminal_image(image, &rules.terminal);
    if json {
        let value = serde_json::json!({
            "image": image,
            "terminal": terminal,
            "base_os": rules.detect_family(image),
        });
        println!("{}", json_pretty(&value)?);
    } else if terminal {
        println!("{image}: terminal ({})", rules.detect_family(image));
    } else {
        println!("{image}: not terminal");
    }
    Ok(EXIT_SUCCESS)
}
