pub mod completions;
pub mod man_pages;
pub mod parse;
pub mod resolve;
pub mod rules;
pub mod source;
pub mod terminal;

use indicatif::{ProgressBar, ProgressStyle};
use recast_chain::{friendly_os, ChainEventKind};
use recast_parser::LayerDescription;
use recast_remote::{FetchConfig, HttpFetcher};
use recast_rules::RuleSet;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_RULES_ERROR: u8 = 2;
pub const EXIT_INPUT_ERROR: u8 = 3;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✗ {msg}"));
}

pub fn colorize_kind(kind: ChainEventKind) -> String {
    use console::Style;
    let label = kind.as_str();
    match kind {
        ChainEventKind::Parsed => Style::new().green().apply_to(label).to_string(),
        ChainEventKind::Fetching => Style::new().cyan().apply_to(label).to_string(),
        ChainEventKind::Terminal => Style::new().blue().bold().apply_to(label).to_string(),
        ChainEventKind::Error => Style::new().red().bold().apply_to(label).to_string(),
        ChainEventKind::Merged => Style::new().green().bold().apply_to(label).to_string(),
    }
}

/// Read a recipe from `path`, or from stdin when `path` is `-`.
pub fn read_recipe(path: &Path) -> Result<String, String> {
    if path.as_os_str() == "-" {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .map_err(|e| format!("failed to read recipe from stdin: {e}"))?;
        return Ok(content);
    }
    std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read recipe {}: {e}", path.display()))
}

/// Load and install the process-wide rule tables from `path`.
pub fn install_rules(path: &Path) -> Result<(), String> {
    let rules = recast_rules::parse_rules_file(path)
        .map_err(|e| format!("rules error: {}: {e}", path.display()))?;
    recast_rules::install(rules).map_err(|e| format!("rules error: {e}"))
}

pub fn make_fetcher(timeout: Option<u64>) -> Result<HttpFetcher, String> {
    let mut config = FetchConfig::load_default().map_err(|e| e.to_string())?;
    if let Some(secs) = timeout {
        if secs == 0 {
            return Err("--remote-timeout must be greater than zero".to_owned());
        }
        config = config.with_timeout(secs);
    }
    Ok(HttpFetcher::new(config))
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "(none)".to_owned()
    } else {
        items.join(", ")
    }
}

/// Container template the layer would be retargeted onto. Unknown families
/// fall back to the default profile.
fn target_line(layer: &LayerDescription, rules: &RuleSet) -> Option<String> {
    rules.profile_or_default(&layer.base_os).map(|p| {
        format!(
            "{} via {} ({})",
            p.container_template, p.package_manager, p.service_manager
        )
    })
}

pub fn print_layer(layer: &LayerDescription, rules: &RuleSet) {
    let base = if layer.base_image.is_empty() {
        "(none)"
    } else {
        layer.base_image.as_str()
    };
    println!("base_image:   {base}");
    println!("base_os:      {} ({})", layer.base_os, friendly_os(layer, rules));
    if let Some(target) = target_line(layer, rules) {
        println!("target:       {target}");
    }
    if let Some(ref url) = layer.repo_url {
        println!("repo_url:     {url}");
    }
    println!("packages:     {}", layer.packages.len());
    for group in &layer.package_layers {
        println!("  {:<24} {}", group.label.as_str(), group.packages.join(" "));
    }
    if !layer.interpreter_packages.is_empty() {
        println!("interpreter:  {}", layer.interpreter_packages.join(" "));
    }
    println!("ports:        {}", join_or_none(&layer.ports));
    println!("volumes:      {}", join_or_none(&layer.volumes));
    if !layer.env.is_empty() {
        println!("env:");
        for var in &layer.env {
            println!("  {}={}", var.key, var.default);
        }
    }
    if !layer.accounts.is_empty() {
        println!("accounts:     {}", layer.accounts.join(", "));
    }
    if !layer.signing_keys.is_empty() || !layer.repositories.is_empty() {
        println!(
            "repositories: {} ({} signing keys)",
            layer.repositories.len(),
            layer.signing_keys.len()
        );
    }
    let startup = layer.startup_command(&rules.startup).unwrap_or("(none)");
    println!("startup:      {startup}");
    println!("actions:      {}", layer.actions.len());
    let unrecognized: Vec<&str> = layer
        .unrecognized_actions()
        .map(|a| a.original.as_str())
        .collect();
    if !unrecognized.is_empty() {
        println!("unrecognized:");
        for original in unrecognized {
            println!("  {original}");
        }
    }
}
