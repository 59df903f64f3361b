use anyhow::Context;
use copilot_core::config::ClientConfig;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> anyhow::Result<ClientConfig> {
        let bytes = std::fs::read(&self.path)
            .with_context(|| format!("read config: {}", self.path.display()))?;
        let cfg: ClientConfig = serde_json::from_slice(&bytes).context("decode config JSON")?;
        log::debug!("loaded client config from {}", self.path.display());
        Ok(cfg)
    }

    /// Like `load`, but a missing file is not an error.
    pub fn load_optional(&self) -> anyhow::Result<Option<ClientConfig>> {
        if !self.path.exists() {
            return Ok(None);
        }
        self.load().map(Some)
    }
}
