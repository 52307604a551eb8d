//! Depth-first ancestry resolution with a hop budget.

use crate::events::{ChainEvent, ChainEventKind};
use crate::fetch::RecipeFetcher;
use crate::merge::merge_layers;
use crate::source::{infer_recipe_source, repo_url_from_template};
use crate::terminal::{friendly_os, is_terminal_image};
use recast_parser::{parse_dockerfile_with, short_image, LayerDescription};
use recast_rules::RuleSet;

/// Hop budget used when the caller does not choose one.
pub const DEFAULT_MAX_DEPTH: usize = 5;

/// Resolves an application recipe against its fetched ancestry.
///
/// Resolution never fails: unresolvable sources, fetch failures and an
/// exhausted hop budget end that branch with an `error` event, and the
/// composite of everything resolved so far is returned.
pub struct ChainResolver<'a, F: RecipeFetcher + ?Sized> {
    fetcher: &'a F,
    rules: &'a RuleSet,
    max_depth: usize,
}

impl<'a, F: RecipeFetcher + ?Sized> ChainResolver<'a, F> {
    /// Resolver over the process-wide rule tables.
    pub fn new(fetcher: &'a F) -> Self {
        Self {
            fetcher,
            rules: recast_rules::active(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    #[must_use]
    pub fn with_rules(mut self, rules: &'a RuleSet) -> Self {
        self.rules = rules;
        self
    }

    /// Maximum number of ancestors to fetch. Zero resolves nothing beyond
    /// the application layer.
    #[must_use]
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Parse `content` as the application layer and merge in its ancestry.
    ///
    /// `observer` is called synchronously, in order, once per event.
    pub fn resolve(
        &self,
        content: &str,
        observer: Option<&mut dyn FnMut(&ChainEvent)>,
    ) -> LayerDescription {
        let mut ignore = |_: &ChainEvent| {};
        let emit: &mut dyn FnMut(&ChainEvent) = match observer {
            Some(observer) => observer,
            None => &mut ignore,
        };

        let app = parse_dockerfile_with(content, self.rules);
        emit(
            &ChainEvent::new(
                ChainEventKind::Parsed,
                0,
                format!(
                    "layer 0: {} packages, {} ports, {} volumes",
                    app.packages.len(),
                    app.ports.len(),
                    app.volumes.len()
                ),
            )
            .with_image(app.base_image.as_str())
            .with_counts(&app),
        );

        if is_terminal_image(&app.base_image, &self.rules.terminal) {
            emit(&self.terminal_event(0, &app));
            return app;
        }

        let Some(ancestry) = self.resolve_parent(&app.base_image, 1, self.max_depth, emit) else {
            return app;
        };

        let merged = merge_layers(vec![ancestry, app]);
        emit(
            &ChainEvent::new(
                ChainEventKind::Merged,
                0,
                format!("merged layers: {} packages total", merged.packages.len()),
            )
            .with_counts(&merged),
        );
        merged
    }

    /// Fetch, parse and recursively resolve the recipe behind `image`.
    ///
    /// Returns the parent layer merged with everything beneath it, or `None`
    /// when nothing could be resolved at this hop.
    fn resolve_parent(
        &self,
        image: &str,
        hop: usize,
        budget: usize,
        emit: &mut dyn FnMut(&ChainEvent),
    ) -> Option<LayerDescription> {
        let short = short_image(image);
        if budget == 0 {
            tracing::warn!(image, hop, "hop budget exhausted");
            emit(
                &ChainEvent::new(
                    ChainEventKind::Error,
                    hop,
                    "max depth reached, stopping chain resolution",
                )
                .with_image(image),
            );
            return None;
        }

        let Some(source) = infer_recipe_source(image, None, self.rules) else {
            tracing::warn!(image, hop, "no source convention matches");
            emit(
                &ChainEvent::new(
                    ChainEventKind::Error,
                    hop,
                    format!("cannot resolve recipe URL for {short}"),
                )
                .with_image(image),
            );
            return None;
        };

        emit(
            &ChainEvent::new(
                ChainEventKind::Fetching,
                hop,
                format!("fetching parent: {short}"),
            )
            .with_image(short)
            .with_url(source.template.as_str()),
        );
        let fetched = match self.fetcher.fetch_recipe(&source.template, &source.branch) {
            Ok(fetched) => fetched,
            Err(e) => {
                tracing::warn!(image, hop, error = %e, "fetch failed");
                emit(
                    &ChainEvent::new(
                        ChainEventKind::Error,
                        hop,
                        format!("failed to fetch {short}: {e}"),
                    )
                    .with_image(short),
                );
                return None;
            }
        };
        tracing::debug!(image, hop, url = %fetched.url, "fetched parent recipe");

        let mut layer = parse_dockerfile_with(&fetched.content, self.rules);
        if let Some(repo) = repo_url_from_template(&source.template) {
            layer = layer.with_repo_url(repo);
        }
        emit(
            &ChainEvent::new(
                ChainEventKind::Parsed,
                hop,
                format!(
                    "layer {hop} ({short}): {} packages, {} ports",
                    layer.packages.len(),
                    layer.ports.len()
                ),
            )
            .with_image(short)
            .with_counts(&layer),
        );

        if is_terminal_image(&layer.base_image, &self.rules.terminal) {
            emit(&self.terminal_event(hop + 1, &layer));
            return Some(layer);
        }

        match self.resolve_parent(&layer.base_image, hop + 1, budget - 1, emit) {
            Some(beneath) => Some(merge_layers(vec![beneath, layer])),
            None => Some(layer),
        }
    }

    fn terminal_event(&self, hop: usize, layer: &LayerDescription) -> ChainEvent {
        ChainEvent::new(
            ChainEventKind::Terminal,
            hop,
            format!("base OS: {} (terminal)", friendly_os(layer, self.rules)),
        )
        .with_image(layer.base_image.as_str())
    }
}

/// Resolve `content` with the process-wide rule tables.
pub fn resolve_chain<F: RecipeFetcher + ?Sized>(
    fetcher: &F,
    content: &str,
    max_depth: usize,
    observer: Option<&mut dyn FnMut(&ChainEvent)>,
) -> LayerDescription {
    ChainResolver::new(fetcher)
        .max_depth(max_depth)
        .resolve(content, observer)
}
