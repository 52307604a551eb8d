use super::{
    colorize_kind, json_pretty, make_fetcher, print_layer, read_recipe, spin_fail, spin_ok, spinner,
    EXIT_SUCCESS,
};
use recast_chain::{
    infer_recipe_source, recover_service_command, repo_url_from_template, ChainEvent,
    ChainEventKind, ChainResolver, RecipeFetcher, RecipeSource,
};
use std::path::Path;

pub struct ResolveArgs<'a> {
    pub recipe: Option<&'a Path>,
    pub image: Option<&'a str>,
    pub github: Option<&'a str>,
    pub branch: Option<&'a str>,
    pub max_depth: usize,
    pub service: Option<&'a str>,
    pub remote_timeout: Option<u64>,
    pub json_events: bool,
}

fn recipe_source(args: &ResolveArgs<'_>) -> Option<RecipeSource> {
    if args.image.is_none() && args.github.is_none() {
        return None;
    }
    let mut source =
        infer_recipe_source(args.image.unwrap_or(""), args.github, recast_rules::active())?;
    if let Some(branch) = args.branch {
        branch.clone_into(&mut source.branch);
    }
    Some(source)
}

pub fn run(args: &ResolveArgs<'_>, json: bool) -> Result<u8, String> {
    let rules = recast_rules::active();
    let fetcher = make_fetcher(args.remote_timeout)?;
    let source = recipe_source(args);

    let content = if let Some(path) = args.recipe {
        read_recipe(path)?
    } else {
        let Some(ref source) = source else {
            return Err(match args.image.or(args.github) {
                Some(reference) => format!("cannot resolve recipe URL for {reference}"),
                None => "no recipe given: pass a file, '-', --image or --github".to_owned(),
            });
        };
        let fetched = fetcher
            .fetch_recipe(&source.template, &source.branch)
            .map_err(|e| format!("failed to fetch recipe: {e}"))?;
        tracing::info!(url = %fetched.url, "fetched application recipe");
        fetched.content
    };

    let pb = (!json && !args.json_events).then(|| spinner("resolving base images..."));
    let mut errors = 0usize;
    let mut on_event = |event: &ChainEvent| {
        if event.kind == ChainEventKind::Error {
            errors += 1;
        }
        if args.json_events {
            match serde_json::to_string(event) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!("failed to serialize event: {e}"),
            }
        } else if let Some(ref pb) = pb {
            pb.suspend(|| {
                eprintln!(
                    "{} {}{}",
                    colorize_kind(event.kind),
                    "  ".repeat(event.hop),
                    event.message
                );
            });
            pb.set_message(event.message.clone());
        }
    };
    let mut layer = ChainResolver::new(&fetcher)
        .with_rules(rules)
        .max_depth(args.max_depth)
        .resolve(&content, Some(&mut on_event));

    if let Some(url) = source
        .as_ref()
        .and_then(|s| repo_url_from_template(&s.template))
    {
        layer = layer.with_repo_url(url);
    }

    if let Some(name) = args.service {
        match source {
            Some(ref source) => match recover_service_command(&fetcher, source, name) {
                Ok(Some(command)) => layer = layer.with_service_command(command),
                Ok(None) => tracing::warn!("no service command found for {name}"),
                Err(e) => tracing::warn!("failed to fetch init script for {name}: {e}"),
            },
            None => tracing::warn!("--service needs --image or --github to locate the init script"),
        }
    }

    if let Some(ref pb) = pb {
        let summary = format!("resolved {} packages", layer.packages.len());
        if errors > 0 {
            spin_fail(pb, &format!("{summary}, chain incomplete"));
        } else {
            spin_ok(pb, &summary);
        }
    }

    if args.json_events {
        let line =
            serde_json::to_string(&layer).map_err(|e| format!("JSON serialization failed: {e}"))?;
        println!("{line}");
    } else if json {
        println!("{}", json_pretty(&layer)?);
    } else {
        print_layer(&layer, rules);
    }
    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args<'a>(image: Option<&'a str>, github: Option<&'a str>) -> ResolveArgs<'a> {
        ResolveArgs {
            recipe: None,
            image,
            github,
            branch: None,
            max_depth: 5,
            service: None,
            remote_timeout: None,
            json_events: false,
        }
    }

    #[test]
    fn source_from_image_convention() {
        let source = recipe_source(&args(Some("lscr.io/linuxserver/sonarr:latest"), None)).unwrap();
        assert_eq!(
            source.template,
            "https://raw.githubusercontent.com/linuxserver/docker-sonarr/{branch}/Dockerfile"
        );
    }

    #[test]
    fn branch_flag_overrides_inferred_branch() {
        let mut a = args(None, Some("https://github.com/acme/app/tree/dev"));
        a.branch = Some("release");
        let source = recipe_source(&a).unwrap();
        assert_eq!(source.branch, "release");
    }

    #[test]
    fn no_source_without_image_or_github() {
        assert!(recipe_source(&args(None, None)).is_none());
    }

    #[test]
    fn missing_recipe_and_source_is_error() {
        let err = run(&args(None, None), true).unwrap_err();
        assert!(err.starts_with("no recipe given"));
    }

    #[test]
    fn unknown_convention_is_error() {
        let err = run(&args(Some("registry.example.com/custom:1"), None), true).unwrap_err();
        assert_eq!(err, "cannot resolve recipe URL for registry.example.com/custom:1");
    }
}
