//! Service command recovery for the application layer.

use crate::fetch::{FetchError, RecipeFetcher};
use crate::source::RecipeSource;
use recast_parser::{infer_init_script_url, parse_init_script};

/// Fetch the init helper script for `app_name` beside the recipe at
/// `source` and extract the foreground command it starts.
///
/// `Ok(None)` when no script URL can be derived or the script starts nothing
/// recognisable.
pub fn recover_service_command<F: RecipeFetcher + ?Sized>(
    fetcher: &F,
    source: &RecipeSource,
    app_name: &str,
) -> Result<Option<String>, FetchError> {
    let url = infer_init_script_url(&source.template, app_name);
    if url.is_empty() {
        return Ok(None);
    }
    let fetched = fetcher.fetch_recipe(&url, &source.branch)?;
    let command = parse_init_script(&fetched.content);
    tracing::debug!(url = %fetched.url, found = !command.is_empty(), "init script parsed");
    Ok((!command.is_empty()).then_some(command))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MemoryFetcher;

    fn source() -> RecipeSource {
        RecipeSource {
            template: "https://raw.githubusercontent.com/linuxserver/docker-resilio-sync/{branch}/Dockerfile".to_owned(),
            branch: "master".to_owned(),
        }
    }

    #[test]
    fn recovers_exec_command() {
        let fetcher = MemoryFetcher::new().with(
            "https://raw.githubusercontent.com/linuxserver/docker-resilio-sync/{branch}/root/etc/s6-overlay/s6-rc.d/svc-resilio-sync/run",
            "#!/usr/bin/with-contenv bash\nexec s6-setuidgid abc /usr/bin/rslsync --nodaemon\n",
        );
        let cmd = recover_service_command(&fetcher, &source(), "Resilio Sync").unwrap();
        assert_eq!(cmd.as_deref(), Some("/usr/bin/rslsync --nodaemon"));
    }

    #[test]
    fn empty_script_yields_none() {
        let fetcher = MemoryFetcher::new().with(
            "https://raw.githubusercontent.com/linuxserver/docker-resilio-sync/{branch}/root/etc/s6-overlay/s6-rc.d/svc-resilio-sync/run",
            "#!/bin/bash\n# nothing\n",
        );
        assert_eq!(recover_service_command(&fetcher, &source(), "resilio-sync").unwrap(), None);
        assert_eq!(recover_service_command(&fetcher, &source(), "").unwrap(), None);
    }

    #[test]
    fn fetch_failure_propagates() {
        let fetcher = MemoryFetcher::new();
        let err = recover_service_command(&fetcher, &source(), "app").unwrap_err();
        assert!(matches!(err, FetchError::NotFound(_)));
    }
}
