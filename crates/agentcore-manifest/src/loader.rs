use std::path::{Path, PathBuf};
use std::sync::Arc;

use agentcore_types::ToolManifest;
use dashmap::DashMap;

use crate::error::{ManifestError, Result};

/// Loads and caches tool manifests from per-vertical YAML files (§3, §6).
///
/// Cache key mirrors the source's `f"{vertical}:default"`: workspace-level
/// overrides are a documented TODO upstream (`tool_manifest.py::load`), not
/// yet implemented there either, so this loader only serves vertical
/// defaults — `load` accepts a `workspace_id` for forward compatibility and
/// API symmetry with the platform's eventual override table but does not
/// yet branch on it.
pub struct ToolManifestLoader {
    config_dir: PathBuf,
    cache: DashMap<String, Arc<ToolManifest>>,
}

impl ToolManifestLoader {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            cache: DashMap::new(),
        }
    }

    fn cache_key(vertical: &str) -> String {
        format!("{vertical}:default")
    }

    pub fn load_from_yaml(&self, vertical: &str) -> Result<Arc<ToolManifest>> {
        let cache_key = Self::cache_key(vertical);
        if let Some(cached) = self.cache.get(&cache_key) {
            return Ok(Arc::clone(&cached));
        }

        let path = self.config_dir.join(format!("{vertical}.yml"));
        if !path.exists() {
            tracing::warn!(
                event = "manifest_not_found",
                vertical,
                path = %path.display(),
                "no manifest found for vertical, returning empty manifest"
            );
            let empty = Arc::new(ToolManifest::empty(vertical));
            self.cache.insert(cache_key, Arc::clone(&empty));
            return Ok(empty);
        }

        let manifest = Arc::new(Self::parse_file(&path)?);
        self.cache.insert(cache_key, Arc::clone(&manifest));
        tracing::info!(
            event = "manifest_loaded",
            vertical,
            tool_count = manifest.tools.len(),
            version = %manifest.version,
        );
        Ok(manifest)
    }

    fn parse_file(path: &Path) -> Result<ToolManifest> {
        let raw = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ManifestError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Precedence: (1) DB override for `workspace_id` — not yet implemented
    /// upstream, reserved here; (2) YAML default for `vertical`.
    pub fn load(&self, _workspace_id: &str, vertical: &str) -> Result<Arc<ToolManifest>> {
        self.load_from_yaml(vertical)
    }

    /// Invalidate the whole cache. Readers holding an `Arc` from before the
    /// clear keep using their snapshot — copy-on-write reload per §5.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

impl Default for ToolManifestLoader {
    fn default() -> Self {
        Self::new("config/tools")
    }
}
