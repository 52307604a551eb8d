//! Service command recovery from init-system helper scripts.
//!
//! Images built on an s6-overlay base start their service from a `run` script
//! next to the recipe rather than from `CMD`. The script is fetched
//! out-of-band; these helpers locate it and pull the foreground command out.

/// Prefixes of run-script lines that set up the environment rather than start the service.
const SETUP_PREFIXES: &[&str] = &["cd ", "umask", "chown", "if "];

/// Lines that only close or continue a shell block.
const BLOCK_KEYWORDS: &[&str] = &["then", "else", "fi", "done", "esac", "}"];

/// Run-script URL for `app_name` beside a recipe URL template.
///
/// `recipe_url` is the recipe template (`.../{branch}/Dockerfile`); the result
/// keeps its `{branch}` placeholder. Empty when either input is empty.
pub fn infer_init_script_url(recipe_url: &str, app_name: &str) -> String {
    let kebab = kebab_case(app_name);
    if recipe_url.is_empty() || kebab.is_empty() {
        return String::new();
    }
    let base = recipe_url.strip_suffix("/Dockerfile").unwrap_or(recipe_url);
    let base = base.trim_end_matches('/');
    format!("{base}/root/etc/s6-overlay/s6-rc.d/svc-{kebab}/run")
}

/// The foreground command a run script starts.
///
/// Scans upward from the last line: the argument of the last `exec` (with
/// `s6-*` privilege or notification wrappers removed), or the last meaningful
/// line that is not environment setup. Empty when nothing qualifies.
pub fn parse_init_script(content: &str) -> String {
    for line in content.lines().rev() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(cmd) = line.strip_prefix("exec ") {
            let cmd = cmd.trim();
            if cmd.starts_with("s6-") {
                if let Some(idx) = cmd.rfind("-- ") {
                    return cmd[idx + 3..].trim().to_owned();
                }
                if let Some(idx) = cmd.find('/') {
                    return cmd[idx..].trim().to_owned();
                }
            }
            return cmd.to_owned();
        }
        if !SETUP_PREFIXES.iter().any(|p| line.starts_with(p)) && !BLOCK_KEYWORDS.contains(&line) {
            return line.to_owned();
        }
    }
    String::new()
}

/// Lowercase, non-alphanumerics collapsed to single hyphens.
pub fn kebab_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_script_url_from_recipe_template() {
        let base = "https://raw.githubusercontent.com/linuxserver/docker-resilio-sync/{branch}/Dockerfile";
        assert_eq!(
            infer_init_script_url(base, "Resilio Sync"),
            "https://raw.githubusercontent.com/linuxserver/docker-resilio-sync/{branch}/root/etc/s6-overlay/s6-rc.d/svc-resilio-sync/run"
        );
    }

    #[test]
    fn init_script_url_empty_inputs() {
        assert_eq!(infer_init_script_url("", "anything"), "");
        assert_eq!(infer_init_script_url("https://x/{branch}/Dockerfile", "!!"), "");
    }

    #[test]
    fn simple_exec() {
        let script = "#!/usr/bin/with-contenv bash\n# shellcheck shell=bash\nexec /usr/bin/rslsync --nodaemon --config /config/sync.conf\n";
        assert_eq!(
            parse_init_script(script),
            "/usr/bin/rslsync --nodaemon --config /config/sync.conf"
        );
    }

    #[test]
    fn s6_wrapper_is_stripped() {
        let script = "#!/usr/bin/with-contenv bash\ncd /app || exit\nexec s6-setuidgid abc -- /usr/bin/myapp --port 8080\n";
        assert_eq!(parse_init_script(script), "/usr/bin/myapp --port 8080");

        let script = "exec s6-setuidgid abc /usr/bin/python3 /app/main.py\n";
        assert_eq!(parse_init_script(script), "/usr/bin/python3 /app/main.py");
    }

    #[test]
    fn comment_only_script_is_empty() {
        assert_eq!(parse_init_script("#!/bin/bash\n# just comments\n"), "");
        assert_eq!(parse_init_script(""), "");
    }

    #[test]
    fn last_meaningful_non_exec_line() {
        let script = "#!/bin/bash\numask 022\n/usr/bin/myapp --serve\n";
        assert_eq!(parse_init_script(script), "/usr/bin/myapp --serve");

        let script = "#!/bin/bash\n/usr/bin/myapp --serve\nif [ -f /x ]; then\n  chown abc /x\nfi\n";
        assert_eq!(parse_init_script(script), "/usr/bin/myapp --serve");

        let script = "find /config -type d\n";
        assert_eq!(parse_init_script(script), "find /config -type d");
    }

    #[test]
    fn kebab_case_collapses_separators() {
        assert_eq!(kebab_case("Resilio Sync"), "resilio-sync");
        assert_eq!(kebab_case("--My__App--"), "my-app");
        assert_eq!(kebab_case("qBittorrent"), "qbittorrent");
    }
}
