use std::{collections::HashMap, fmt::Display};

use yansi::Color;

/// Coarse bucket used to route remote reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeverityClass {
    Info,
    Success,
    Notice,
    Warning,
    Error,
    Critical,
    Unspecified,
}

impl SeverityClass {
    /// Warnings and worse go to the alert channel.
    pub fn is_alert(&self) -> bool {
        matches!(
            self,
            SeverityClass::Warning | SeverityClass::Error | SeverityClass::Critical
        )
    }
}

impl Display for SeverityClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeverityClass::Info => write!(f, "info"),
            SeverityClass::Success => write!(f, "success"),
            SeverityClass::Notice => write!(f, "notice"),
            SeverityClass::Warning => write!(f, "warning"),
            SeverityClass::Error => write!(f, "error"),
            SeverityClass::Critical => write!(f, "critical"),
            SeverityClass::Unspecified => write!(f, "unspecified"),
        }
    }
}

/// Presentation metadata for one level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelDescriptor {
    pub id: &'static str,
    /// Fixed-width prefix written at the start of every record.
    pub code: &'static str,
    /// Glyph used in remote report titles.
    pub marker: &'static str,
    pub text_color: Color,
    /// 24-bit RGB used for remote embeds.
    pub alert_color: u32,
    pub severity: SeverityClass,
}

pub const INFO: LevelDescriptor = LevelDescriptor {
    id: "info",
    code: "[i]",
    marker: "ℹ️",
    text_color: Color::BrightBlue,
    alert_color: 0x5865F2,
    severity: SeverityClass::Info,
};

pub const OK: LevelDescriptor = LevelDescriptor {
    id: "ok",
    code: "[o]",
    marker: "✅",
    text_color: Color::BrightGreen,
    alert_color: 0x4AEF4F,
    severity: SeverityClass::Success,
};

pub const NOTICE: LevelDescriptor = LevelDescriptor {
    id: "notice",
    code: "[*]",
    marker: "📣",
    text_color: Color::Yellow,
    alert_color: 0xFEE75C,
    severity: SeverityClass::Notice,
};

pub const WARNING: LevelDescriptor = LevelDescriptor {
    id: "warning",
    code: "[!]",
    marker: "⚠️",
    text_color: Color::BrightYellow,
    alert_color: 0xF1C40F,
    severity: SeverityClass::Warning,
};

pub const ERROR: LevelDescriptor = LevelDescriptor {
    id: "error",
    code: "[-]",
    marker: "❌",
    text_color: Color::BrightRed,
    alert_color: 0xEF4A4A,
    severity: SeverityClass::Error,
};

pub const CRITICAL: LevelDescriptor = LevelDescriptor {
    id: "critical",
    code: "[X]",
    marker: "🛑",
    text_color: Color::Red,
    alert_color: 0x000000,
    severity: SeverityClass::Critical,
};

pub const UNSPECIFIED: LevelDescriptor = LevelDescriptor {
    id: "?",
    code: "[?]",
    marker: "📝",
    text_color: Color::Primary,
    alert_color: 0xFFFFFF,
    severity: SeverityClass::Unspecified,
};

pub const STANDARD_LEVELS: [LevelDescriptor; 6] = [INFO, OK, NOTICE, WARNING, ERROR, CRITICAL];

pub const STANDARD_ALIASES: [(&str, &str); 3] =
    [("warn", "warning"), ("crit", "critical"), ("success", "ok")];

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("level `{0}` is already registered")]
    Duplicate(String),

    #[error("can't alias `{alias}` to unknown level `{target}`")]
    UnknownTarget { alias: String, target: String },
}

/// Lookup table from level id to [`LevelDescriptor`].
///
/// Filled once while the logger is being built and shared read-only after
/// that, so lookups never need a lock.
#[derive(Debug, Clone)]
pub struct Registry {
    levels: HashMap<String, LevelDescriptor>,
    fallback: LevelDescriptor,
}

impl Registry {
    pub fn empty() -> Self {
        Self {
            levels: HashMap::new(),
            fallback: UNSPECIFIED,
        }
    }

    /// The six named levels plus the short aliases (`warn`, `crit`, `success`).
    pub fn standard() -> Self {
        let mut registry = Self::empty();

        for level in STANDARD_LEVELS {
            let registered = registry.register(level);
            debug_assert!(registered.is_ok(), "{:?}", registered);
        }

        for (alias, target) in STANDARD_ALIASES {
            let registered = registry.register_alias(alias, target);
            debug_assert!(registered.is_ok(), "{:?}", registered);
        }

        registry
    }

    pub fn register(&mut self, descriptor: LevelDescriptor) -> Result<(), RegistryError> {
        let key = descriptor.id.to_lowercase();
        if self.levels.contains_key(&key) {
            return Err(RegistryError::Duplicate(key));
        }

        self.levels.insert(key, descriptor);
        Ok(())
    }

    pub fn register_alias(&mut self, alias: &str, target: &str) -> Result<(), RegistryError> {
        let alias = alias.to_lowercase();
        if self.levels.contains_key(&alias) {
            return Err(RegistryError::Duplicate(alias));
        }

        let descriptor = self
            .levels
            .get(&target.to_lowercase())
            .copied()
            .ok_or_else(|| RegistryError::UnknownTarget {
                alias: alias.clone(),
                target: target.to_string(),
            })?;

        self.levels.insert(alias, descriptor);
        Ok(())
    }

    /// Never fails: unknown ids resolve to the unspecified descriptor.
    pub fn describe(&self, id: &str) -> LevelDescriptor {
        self.levels
            .get(&id.to_lowercase())
            .copied()
            .unwrap_or(self.fallback)
    }

    pub fn by_code(&self, code: &str) -> Option<LevelDescriptor> {
        if self.fallback.code == code {
            return Some(self.fallback);
        }

        self.levels.values().find(|l| l.code == code).copied()
    }

    /// Every distinct record prefix, fallback included.
    pub fn codes(&self) -> Vec<&'static str> {
        let mut codes: Vec<&'static str> = self.levels.values().map(|l| l.code).collect();
        codes.push(self.fallback.code);
        codes.sort_unstable();
        codes.dedup();
        codes
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::standard()
    }
}
