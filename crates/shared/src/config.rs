//! Application configuration management.
//!
//! Role and permission assignments are static configuration: loaded once at
//! process start and treated as read-only for the process lifetime. Invalid
//! role configuration is fatal; the graph is validated before the engine
//! accepts any request.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Engine configuration.
    #[serde(default)]
    pub engine: EngineSettings,
    /// Role inheritance graph, keyed by role name.
    #[serde(default)]
    pub roles: BTreeMap<String, RoleConfig>,
}

/// Engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSettings {
    /// Approval levels required for a unit with no configured approvers.
    #[serde(default = "default_max_level")]
    pub default_max_level: u8,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_max_level: default_max_level(),
        }
    }
}

fn default_max_level() -> u8 {
    1
}

/// One role's declared permissions and parent roles.
///
/// Parents are role names; the graph they form must be acyclic. Validation
/// happens in the role resolver, not here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoleConfig {
    /// Permission tokens granted directly to this role.
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Roles whose resolved permissions this role inherits.
    #[serde(default)]
    pub parents: Vec<String>,
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("TREZO").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
