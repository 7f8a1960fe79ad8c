use std::{collections::HashMap, path::PathBuf};

use eyre::eyre;

use crate::logging::{ChannelId, Routes};

pub const LOG_DIR_VAR: &str = "RELAYLOG_DIR";
pub const LOG_WEBHOOK_VAR: &str = "RELAYLOG_LOG_WEBHOOK";
pub const ALERT_WEBHOOK_VAR: &str = "RELAYLOG_ALERT_WEBHOOK";
pub const REPORT_VAR: &str = "RELAYLOG_REPORT";
pub const CA_BUNDLE_VAR: &str = "RELAYLOG_CA_BUNDLE";

pub trait ConfigManager: Sized + Clone + Send + Sync {
    fn get_log_dir(&self) -> eyre::Result<PathBuf>;
    fn get_routes(&self) -> Option<Routes>;
    fn get_ca_bundle(&self) -> Option<PathBuf>;
    fn report_by_default(&self) -> eyre::Result<bool>;
}

/// Settings from the environment, with an optional log dir override from the
/// command line.
#[derive(Default, Clone, Debug)]
pub struct LocalConfigManager {
    vars: HashMap<String, String>,
    log_dir: Option<PathBuf>,
}

impl LocalConfigManager {
    pub fn new() -> Self {
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            log_dir: None,
        }
    }

    pub fn with_log_dir(self, log_dir: Option<PathBuf>) -> Self {
        Self { log_dir, ..self }
    }

    fn var(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    #[cfg(not(target_os = "windows"))]
    fn home_dir(&self) -> Option<PathBuf> {
        self.var("HOME").map(PathBuf::from)
    }

    #[cfg(target_os = "windows")]
    fn home_dir(&self) -> Option<PathBuf> {
        self.var("USERPROFILE").map(PathBuf::from)
    }

    pub fn data_dir(&self) -> eyre::Result<PathBuf> {
        let data_dir = match self.var("XDG_DATA_HOME") {
            Some(dir) => PathBuf::from(dir),
            None => self
                .home_dir()
                .map(|home| home.join(".local").join("share"))
                .ok_or_else(|| eyre!("Neither XDG_DATA_HOME nor HOME is set"))?,
        };

        Ok(data_dir.join("relaylog"))
    }
}

impl ConfigManager for LocalConfigManager {
    fn get_log_dir(&self) -> eyre::Result<PathBuf> {
        if let Some(dir) = &self.log_dir {
            return Ok(dir.clone());
        }

        if let Some(dir) = self.var(LOG_DIR_VAR) {
            return Ok(PathBuf::from(dir));
        }

        Ok(self.data_dir()?.join("logs"))
    }

    fn get_routes(&self) -> Option<Routes> {
        let general = self.var(LOG_WEBHOOK_VAR).map(ChannelId::new);
        let alert = self.var(ALERT_WEBHOOK_VAR).map(ChannelId::new);

        match (general, alert) {
            (Some(general), Some(alert)) => Some(Routes::new(general, alert)),
            (Some(channel), None) | (None, Some(channel)) => Some(Routes::single(channel)),
            (None, None) => None,
        }
    }

    fn get_ca_bundle(&self) -> Option<PathBuf> {
        self.var(CA_BUNDLE_VAR).map(PathBuf::from)
    }

    fn report_by_default(&self) -> eyre::Result<bool> {
        let Some(value) = self.var(REPORT_VAR) else {
            return Ok(true);
        };

        match value.to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(eyre!("Invalid value for {}: {}", REPORT_VAR, other)),
        }
    }
}
