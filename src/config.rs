//! Ambient configuration and logging setup.
//!
//! Neither has anything to do with the store's data model; they exist so a
//! binary embedding this crate doesn't have to reinvent them. Both are
//! feature-gated the same way `betree` gates its own `figment`/`env_logger`
//! use: a library should not force either dependency onto a caller who
//! already has their own config or logging story.

#[cfg(feature = "figment_config")]
use figment::{providers::Env, Figment};
use serde::{Deserialize, Serialize};

/// Runtime knobs read from the `N2A_*` environment, with sane defaults for
/// everything. `Figment` merges providers in order, so an unset variable
/// simply falls through to the default already in the figment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// Suffix appended to entries scanned by [`crate::group::directory`]
    /// when one isn't given explicitly (e.g. `"mine"` for MDir's model
    /// documents).
    pub default_suffix: Option<String>,
    /// Whether a disk or parse failure should panic instead of merely being
    /// reported through [`crate::diagnostics`]. Off by default, matching the
    /// original's tolerance of partially-readable files. Applying this
    /// value is the caller's job — call [`crate::diagnostics::set_strict`]
    /// after loading the config.
    pub strict_parsing: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            default_suffix: None,
            strict_parsing: false,
        }
    }
}

#[cfg(feature = "figment_config")]
impl StoreConfig {
    /// Builds a config from defaults overlaid with `N2A_`-prefixed
    /// environment variables, e.g. `N2A_STRICT_PARSING=1`.
    pub fn from_env() -> Result<Self, figment::Error> {
        Figment::from(figment::providers::Serialized::defaults(
            StoreConfig::default(),
        ))
        .merge(Env::prefixed("N2A_"))
        .extract()
    }
}

/// Initializes `env_logger` from `RUST_LOG`, defaulting to `info` when unset.
/// A binary embedding this crate is free to set up its own logger instead;
/// this is a convenience, not a requirement the rest of the crate depends
/// on — every other module only ever talks to the `log` facade.
#[cfg(feature = "init_env_logger")]
pub fn init_logging() {
    let mut builder = env_logger::Builder::new();
    builder.parse_filters(
        &std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
    );
    let _ = builder.try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_no_suffix_and_is_lenient() {
        let cfg = StoreConfig::default();
        assert_eq!(cfg.default_suffix, None);
        assert!(!cfg.strict_parsing);
    }

    #[cfg(feature = "figment_config")]
    #[test]
    fn env_override_is_picked_up() {
        std::env::set_var("N2A_STRICT_PARSING", "true");
        let cfg = StoreConfig::from_env().unwrap();
        assert!(cfg.strict_parsing);
        std::env::remove_var("N2A_STRICT_PARSING");
    }
}
