//! Single-pass Dockerfile parser producing one [`LayerDescription`].

use crate::classify::{
    categorize, interpreter_install, native_install, repository, signing_key, Effect,
    GroupTracker,
};
use crate::image::{has_unresolved_ref, layer_label, substitute, StageTable};
use crate::layer::{CopyAction, EnvVar, LayerDescription, PackageLayer, StartupIntent};
use crate::lexer::{json_array, logical_lines, split_commands, split_words, unquote};
use crate::types::OsFamily;
use recast_rules::RuleSet;
use std::collections::HashSet;
use std::hash::Hash;

/// Parse recipe text with the process-wide rule tables.
///
/// Never fails: constructs nothing recognises end up as unknown actions or are
/// left out.
pub fn parse_dockerfile(content: &str) -> LayerDescription {
    parse_dockerfile_with(content, recast_rules::active())
}

/// Parse recipe text against an explicit rule set.
pub fn parse_dockerfile_with(content: &str, rules: &RuleSet) -> LayerDescription {
    let mut parser = LayerParser::new(rules);
    for line in logical_lines(content) {
        parser.dispatch(line.trim());
    }
    parser.finish()
}

struct LayerParser<'r> {
    rules: &'r RuleSet,
    stages: StageTable,
    groups: GroupTracker,
    layer: LayerDescription,
}

impl<'r> LayerParser<'r> {
    fn new(rules: &'r RuleSet) -> Self {
        Self {
            rules,
            stages: StageTable::new(),
            groups: GroupTracker::new(),
            layer: LayerDescription::default(),
        }
    }

    fn dispatch(&mut self, line: &str) {
        if line.is_empty() || line.starts_with('#') {
            return;
        }
        let (keyword, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(k, r)| (k, r.trim()));
        match keyword.to_ascii_uppercase().as_str() {
            "ARG" => self.arg(rest),
            "FROM" => self.stage(rest),
            "EXPOSE" => self.expose(rest),
            "VOLUME" => self.volume(rest),
            "ENV" => self.env(rest),
            "COPY" => self.copy(rest, false),
            "ADD" => self.copy(rest, true),
            "CMD" => self.layer.startup.command = exec_text(rest),
            "ENTRYPOINT" => self.layer.startup.entrypoint = exec_text(rest),
            "RUN" => self.run(rest),
            _ => {}
        }
    }

    fn arg(&mut self, rest: &str) {
        for word in split_words(rest) {
            match word.split_once('=') {
                Some((name, default)) => self.stages.declare_arg(name, Some(default)),
                None => self.stages.declare_arg(&word, None),
            }
        }
    }

    fn stage(&mut self, rest: &str) {
        let words: Vec<&str> = rest
            .split_whitespace()
            .filter(|w| !w.starts_with("--"))
            .collect();
        let Some(image) = words.first() else {
            return;
        };
        let alias = match words.as_slice() {
            [_, kw, alias, ..] if kw.eq_ignore_ascii_case("as") => Some(*alias),
            _ => None,
        };
        if self.stages.stage_count() > 0 {
            self.reset_stage_actions();
        }
        tracing::trace!(image, alias, "stage declared");
        self.stages.declare_stage(image, alias);
    }

    /// Operations scoped to a build stage that may never reach the final image.
    fn reset_stage_actions(&mut self) {
        let layer = &mut self.layer;
        layer.actions.clear();
        layer.accounts.clear();
        layer.directories.clear();
        layer.downloads.clear();
        layer.symlinks.clear();
        layer.copies.clear();
        layer.startup = StartupIntent::default();
    }

    fn expose(&mut self, rest: &str) {
        for word in rest.split_whitespace() {
            let word = self.stages.substitute_args(word);
            let port = word.split('/').next().unwrap_or("").trim();
            if port.is_empty() || port.contains('$') {
                continue;
            }
            self.layer.ports.push(port.to_owned());
        }
    }

    fn volume(&mut self, rest: &str) {
        let paths = json_array(rest).unwrap_or_else(|| split_words(rest));
        for path in paths {
            let path = self.stages.substitute_args(path.trim());
            if path.is_empty() || has_unresolved_ref(&path) {
                continue;
            }
            self.layer.volumes.push(path);
        }
    }

    fn env(&mut self, rest: &str) {
        let words = split_words(rest);
        let Some(first) = words.first() else {
            return;
        };
        let pairs: Vec<(String, String)> = if first.contains('=') {
            words
                .iter()
                .filter_map(|w| w.split_once('='))
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect()
        } else {
            // legacy form: ENV KEY value with spaces
            let value = rest
                .split_once(char::is_whitespace)
                .map_or("", |(_, v)| v.trim());
            vec![(first.clone(), unquote(value).to_owned())]
        };
        for (key, value) in pairs {
            if key.is_empty() {
                continue;
            }
            let default = substitute(&value, |name| {
                self.stages.arg(name).or_else(|| self.layer.env_value(name))
            });
            self.layer.env.push(EnvVar { key, default });
        }
    }

    fn copy(&mut self, rest: &str, is_add: bool) {
        let mut body = rest;
        let mut from_stage = None;
        while body.starts_with("--") {
            let (flag, tail) = body
                .split_once(char::is_whitespace)
                .map_or((body, ""), |(f, t)| (f, t.trim_start()));
            if let Some(stage) = flag.strip_prefix("--from=") {
                from_stage = Some(stage.to_owned());
            }
            body = tail;
        }
        let parts = json_array(body).unwrap_or_else(|| split_words(body));
        let Some((dest, sources)) = parts.split_last() else {
            return;
        };
        if sources.is_empty() {
            return;
        }
        for src in sources {
            self.layer.copies.push(CopyAction {
                src: src.clone(),
                dest: dest.clone(),
                from_stage: from_stage.clone(),
                is_url: is_add && (src.starts_with("http://") || src.starts_with("https://")),
            });
        }
    }

    fn run(&mut self, rest: &str) {
        let mut body = rest;
        // RUN --mount=... --network=...
        while body.starts_with("--") {
            body = body
                .split_once(char::is_whitespace)
                .map_or("", |(_, t)| t.trim_start());
        }
        let body = match json_array(body) {
            Some(argv) => exec_script(&argv),
            None => body.to_owned(),
        };
        for cmd in split_commands(&body) {
            self.sub_command(&cmd);
        }
    }

    fn sub_command(&mut self, cmd: &str) {
        self.groups.observe(cmd);
        if let Some(key) = signing_key(cmd) {
            self.layer.signing_keys.push(key);
        }
        if let Some(repo) = repository(cmd) {
            self.layer.repositories.push(repo);
        }
        if let Some((manager, pkgs)) = native_install(cmd) {
            tracing::trace!(?manager, count = pkgs.len(), "native packages");
            self.layer.packages.extend(pkgs);
        }
        if let Some(pkgs) = interpreter_install(cmd) {
            self.layer.interpreter_packages.extend(pkgs);
        }
        let Some(categorized) = categorize(cmd, self.rules) else {
            return;
        };
        tracing::trace!(kind = %categorized.action.kind, cmd, "classified");
        match categorized.effect {
            Some(Effect::Directories(dirs)) => self.layer.directories.extend(dirs),
            Some(Effect::Account(name)) => self.layer.accounts.push(name),
            Some(Effect::Download(download)) => self.layer.downloads.push(download),
            Some(Effect::Symlink(link)) => self.layer.symlinks.push(link),
            None => {}
        }
        self.layer.actions.push(categorized.action);
    }

    fn finish(self) -> LayerDescription {
        let Self {
            rules,
            stages,
            groups,
            mut layer,
        } = self;

        let excluded = groups.excluded();
        if !excluded.is_empty() {
            layer.packages.retain(|p| !excluded.contains(p.as_str()));
        }
        dedup(&mut layer.packages);
        dedup(&mut layer.interpreter_packages);
        dedup(&mut layer.ports);
        dedup(&mut layer.volumes);
        dedup(&mut layer.accounts);
        dedup(&mut layer.directories);
        dedup(&mut layer.downloads);
        dedup(&mut layer.symlinks);
        dedup_by_key(&mut layer.signing_keys, |k| k.url.clone());
        dedup_by_key(&mut layer.repositories, |r| r.line.clone());

        layer
            .env
            .retain(|e| !rules.environment.is_denied(&e.key) && !has_unresolved_ref(&e.default));
        dedup_by_key(&mut layer.env, |e| e.key.clone());

        layer.base_image = stages
            .resolve_final(&rules.terminal.sentinel)
            .unwrap_or_default();
        layer.base_os = if has_unresolved_ref(&layer.base_image) {
            OsFamily::unknown()
        } else {
            OsFamily::new(rules.detect_family(&layer.base_image))
        };

        let label = layer_label(&layer.base_image);
        if !layer.packages.is_empty() {
            layer.package_layers = vec![PackageLayer {
                label: label.clone(),
                packages: layer.packages.clone(),
            }];
        }
        if !layer.interpreter_packages.is_empty() {
            layer.interpreter_package_layers = vec![PackageLayer {
                label,
                packages: layer.interpreter_packages.clone(),
            }];
        }

        tracing::debug!(
            base_image = %layer.base_image,
            base_os = %layer.base_os,
            packages = layer.packages.len(),
            actions = layer.actions.len(),
            "parsed recipe"
        );
        layer
    }
}

/// `CMD`/`ENTRYPOINT` text: exec form joined with spaces, shell form as written.
fn exec_text(rest: &str) -> Option<String> {
    let text = match json_array(rest) {
        Some(argv) => argv.join(" "),
        None => rest.trim().to_owned(),
    };
    (!text.is_empty()).then_some(text)
}

/// Script of an exec-form `RUN`: the `-c` argument of a shell, or argv joined.
fn exec_script(argv: &[String]) -> String {
    match argv {
        [shell, flag, script, ..] if shell.ends_with("sh") && flag == "-c" => script.clone(),
        _ => argv.join(" "),
    }
}

/// Remove repeats, keeping first occurrences in order.
pub(crate) fn dedup<T: Eq + Hash + Clone>(items: &mut Vec<T>) {
    let mut seen = HashSet::new();
    items.retain(|item| seen.insert(item.clone()));
}

pub(crate) fn dedup_by_key<T, K: Eq + Hash>(items: &mut Vec<T>, key: impl Fn(&T) -> K) {
    let mut seen = HashSet::new();
    items.retain(|item| seen.insert(key(item)));
}
