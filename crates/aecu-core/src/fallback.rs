//! Fallback script lookup.
//!
//! The fallback for `dir/name.rest.groovy` is the sibling
//! `dir/name.fallback.groovy`. Fallback scripts have no fallback of their
//! own, which bounds fallback execution to one level.

use aecu_repository::node::name_of;

use crate::config::FALLBACK_MARKER;
use crate::domain::Result;
use crate::path_resolver::PathResolver;

/// Path the fallback for `path` would have, or `None` for a fallback script.
pub fn fallback_path(path: &str, extension: &str) -> Option<String> {
    let name = name_of(path);
    if name.contains(FALLBACK_MARKER) {
        return None;
    }
    let directory = &path[..path.len() - name.len()];
    let base = name.split('.').next().unwrap_or(name);
    Some(format!("{directory}{base}.fallback{extension}"))
}

/// The existing fallback script for `path`, if any.
pub async fn get_fallback_script(resolver: &PathResolver<'_>, path: &str) -> Result<Option<String>> {
    let Some(candidate) = fallback_path(path, &resolver.config().script_extension) else {
        return Ok(None);
    };
    if resolver.exists(&candidate).await? {
        Ok(Some(candidate))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AecuConfig;
    use aecu_repository::fakes::MemoryRepository;
    use aecu_repository::{RunModeSet, SessionFactory};

    #[test]
    fn test_fallback_path_uses_base_name() {
        assert_eq!(
            fallback_path("/conf/groovy/upgrade.groovy", ".groovy").as_deref(),
            Some("/conf/groovy/upgrade.fallback.groovy")
        );
        assert_eq!(
            fallback_path("/conf/groovy/upgrade.author.groovy", ".groovy").as_deref(),
            Some("/conf/groovy/upgrade.fallback.groovy")
        );
    }

    #[test]
    fn test_fallback_of_fallback_is_none() {
        assert_eq!(
            fallback_path("/conf/groovy/upgrade.fallback.groovy", ".groovy"),
            None
        );
    }

    #[tokio::test]
    async fn test_get_fallback_script_requires_existing_node() {
        let repo = MemoryRepository::new();
        repo.add_file("/s/a.groovy", "").unwrap();
        repo.add_file("/s/a.fallback.groovy", "").unwrap();
        repo.add_file("/s/b.groovy", "").unwrap();

        let session = repo.login().await.unwrap();
        let run_modes = RunModeSet::default();
        let config = AecuConfig::default();
        let resolver = PathResolver::new(session.as_ref(), &run_modes, &config);

        assert_eq!(
            get_fallback_script(&resolver, "/s/a.groovy").await.unwrap(),
            Some("/s/a.fallback.groovy".to_string())
        );
        assert_eq!(get_fallback_script(&resolver, "/s/b.groovy").await.unwrap(), None);
        assert_eq!(
            get_fallback_script(&resolver, "/s/a.fallback.groovy").await.unwrap(),
            None
        );
    }
}
