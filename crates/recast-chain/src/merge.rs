//! Composite descriptions from parent-first layer lists.

use recast_parser::{layer_label, EnvVar, LayerDescription, LayerLabel, PackageLayer};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Merge layers ordered parent first (index 0 is the deepest ancestor, the
/// last entry is the application layer).
///
/// - base OS comes from the deepest layer; base image and startup intent
///   from the application layer
/// - package sets are unioned in layer order; each input's provenance
///   breakdown is carried over entry by entry, so labels survive repeated
///   merges
/// - environment entries are keyed by name, later layers overriding values
///   while the first occurrence fixes the position
/// - copies come from the application layer only; ancestors contribute only
///   actionable shell actions
///
/// A single layer is returned as is; an empty list yields an empty
/// description with an unknown base OS.
pub fn merge_layers(mut layers: Vec<LayerDescription>) -> LayerDescription {
    let Some(app) = layers.pop() else {
        return LayerDescription::default();
    };
    if layers.is_empty() {
        return app;
    }
    let ancestors = layers;
    let all = || ancestors.iter().chain(std::iter::once(&app));

    let (packages, package_layers) = merge_breakdown(all().map(|l| {
        (
            l.package_layers.as_slice(),
            l.packages.as_slice(),
            l.base_image.as_str(),
        )
    }));
    let (interpreter_packages, interpreter_package_layers) = merge_breakdown(all().map(|l| {
        (
            l.interpreter_package_layers.as_slice(),
            l.interpreter_packages.as_slice(),
            l.base_image.as_str(),
        )
    }));
    let ports = union(all().map(|l| &l.ports), Clone::clone);
    let volumes = union(all().map(|l| &l.volumes), Clone::clone);
    let env = merge_env(all().map(|l| &l.env));
    let signing_keys = union(all().map(|l| &l.signing_keys), |k| k.url.clone());
    let repositories = union(all().map(|l| &l.repositories), |r| r.line.clone());
    let directories = union(all().map(|l| &l.directories), Clone::clone);
    let downloads = union(all().map(|l| &l.downloads), Clone::clone);
    let symlinks = union(all().map(|l| &l.symlinks), Clone::clone);
    let accounts = union(all().map(|l| &l.accounts), Clone::clone);
    let repo_url = all()
        .rev()
        .filter_map(|l| l.repo_url.as_deref())
        .find(|u| !u.is_empty())
        .map(str::to_owned);
    let actions = ancestors
        .iter()
        .flat_map(|l| l.actions.iter().filter(|a| a.kind.is_actionable()))
        .chain(app.actions.iter())
        .cloned()
        .collect();

    let merged = LayerDescription {
        base_os: ancestors[0].base_os.clone(),
        packages,
        package_layers,
        interpreter_packages,
        interpreter_package_layers,
        ports,
        volumes,
        env,
        signing_keys,
        repositories,
        directories,
        downloads,
        symlinks,
        accounts,
        actions,
        repo_url,
        ..app
    };
    tracing::debug!(
        layers = ancestors.len() + 1,
        packages = merged.packages.len(),
        breakdown = merged.package_layers.len(),
        "merged layers"
    );
    merged
}

/// Flatten per-layer package sets into one deduplicated set plus its
/// provenance breakdown. A layer without a breakdown becomes one entry
/// labelled after its base image.
fn merge_breakdown<'a>(
    layers: impl Iterator<Item = (&'a [PackageLayer], &'a [String], &'a str)>,
) -> (Vec<String>, Vec<PackageLayer>) {
    let mut seen = HashSet::new();
    let mut flat = Vec::new();
    let mut breakdown = Vec::new();

    let mut take = |label: &LayerLabel, packages: &[String]| {
        let fresh: Vec<String> = packages
            .iter()
            .filter(|p| seen.insert((*p).clone()))
            .cloned()
            .collect();
        if !fresh.is_empty() {
            flat.extend(fresh.iter().cloned());
            breakdown.push(PackageLayer {
                label: label.clone(),
                packages: fresh,
            });
        }
    };

    for (entries, packages, base_image) in layers {
        if entries.is_empty() {
            take(&layer_label(base_image), packages);
        } else {
            for entry in entries {
                take(&entry.label, &entry.packages);
            }
        }
    }
    (flat, breakdown)
}

/// Child-overrides-parent by key; the first occurrence fixes the order.
fn merge_env<'a>(layers: impl Iterator<Item = &'a Vec<EnvVar>>) -> Vec<EnvVar> {
    let mut order: Vec<String> = Vec::new();
    let mut values: HashMap<String, String> = HashMap::new();
    for env in layers.flatten() {
        if values
            .insert(env.key.clone(), env.default.clone())
            .is_none()
        {
            order.push(env.key.clone());
        }
    }
    order
        .into_iter()
        .filter_map(|key| {
            let default = values.remove(&key)?;
            Some(EnvVar { key, default })
        })
        .collect()
}

/// Order-preserving union, first occurrence of each identity wins.
fn union<'a, T, K>(lists: impl Iterator<Item = &'a Vec<T>>, identity: impl Fn(&T) -> K) -> Vec<T>
where
    T: Clone + 'a,
    K: Eq + Hash,
{
    let mut seen = HashSet::new();
    lists
        .flatten()
        .filter(|item| seen.insert(identity(item)))
        .cloned()
        .collect()
}
