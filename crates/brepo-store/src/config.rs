//! The repository `config` file.
//!
//! Stored as TOML:
//!
//! ```toml
//! [core]
//! mode = "archive"
//! collection-id = "org.example.Repo"
//!
//! [metadata]
//! title = "Example"
//! authenticator-install = true
//!
//! [authenticator-options]
//! realm = "example"
//! ```

use std::collections::BTreeMap;
use std::fmt;

use toml::{Table, Value};

use crate::error::{StoreError, StoreResult};

const CORE: &str = "core";
const METADATA: &str = "metadata";
const AUTHENTICATOR_OPTIONS: &str = "authenticator-options";

/// A scalar configuration key the maintenance engine may set.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConfigKey {
    Title,
    Comment,
    Description,
    Homepage,
    Icon,
    DefaultBranch,
    RedirectUrl,
    CollectionId,
    DeployCollectionId,
    AuthenticatorName,
    AuthenticatorInstall,
    /// One entry of the authenticator's option table.
    AuthenticatorOption(String),
}

impl ConfigKey {
    /// Every fixed key, in the order they are applied.
    pub const SCALARS: [ConfigKey; 11] = [
        ConfigKey::Title,
        ConfigKey::Comment,
        ConfigKey::Description,
        ConfigKey::Homepage,
        ConfigKey::Icon,
        ConfigKey::DefaultBranch,
        ConfigKey::RedirectUrl,
        ConfigKey::CollectionId,
        ConfigKey::DeployCollectionId,
        ConfigKey::AuthenticatorName,
        ConfigKey::AuthenticatorInstall,
    ];

    /// The key name within its table.
    pub fn name(&self) -> &str {
        match self {
            ConfigKey::Title => "title",
            ConfigKey::Comment => "comment",
            ConfigKey::Description => "description",
            ConfigKey::Homepage => "homepage",
            ConfigKey::Icon => "icon",
            ConfigKey::DefaultBranch => "default-branch",
            ConfigKey::RedirectUrl => "redirect-url",
            ConfigKey::CollectionId => "collection-id",
            ConfigKey::DeployCollectionId => "deploy-collection-id",
            ConfigKey::AuthenticatorName => "authenticator-name",
            ConfigKey::AuthenticatorInstall => "authenticator-install",
            ConfigKey::AuthenticatorOption(name) => name,
        }
    }

    /// Keys stored as TOML booleans.
    pub fn is_boolean(&self) -> bool {
        matches!(self, ConfigKey::DeployCollectionId | ConfigKey::AuthenticatorInstall)
    }

    fn table(&self) -> &'static str {
        match self {
            ConfigKey::CollectionId => CORE,
            ConfigKey::AuthenticatorOption(_) => AUTHENTICATOR_OPTIONS,
            _ => METADATA,
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigKey::AuthenticatorOption(name) => write!(f, "authenticator-options.{name}"),
            other => f.write_str(other.name()),
        }
    }
}

/// Parsed `config` file.
#[derive(Clone, Debug, PartialEq)]
pub struct ConfigDocument {
    table: Table,
}

impl ConfigDocument {
    /// Configuration for a freshly created repository.
    pub fn new_repository() -> Self {
        let mut core = Table::new();
        core.insert("mode".into(), Value::String("archive".into()));
        let mut table = Table::new();
        table.insert(CORE.into(), Value::Table(core));
        Self { table }
    }

    pub fn parse(text: &str) -> StoreResult<Self> {
        let table: Table = toml::from_str(text).map_err(|e| StoreError::Config(e.to_string()))?;
        Ok(Self { table })
    }

    pub fn render(&self) -> StoreResult<String> {
        toml::to_string(&self.table).map_err(|e| StoreError::Config(e.to_string()))
    }

    pub fn get(&self, key: &ConfigKey) -> Option<String> {
        let value = self.table.get(key.table())?.as_table()?.get(key.name())?;
        match value {
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn set(&mut self, key: &ConfigKey, value: Option<&str>) -> StoreResult<()> {
        let section = self
            .table
            .entry(key.table())
            .or_insert(Value::Table(Table::new()));
        let Value::Table(section) = section else {
            return Err(StoreError::Config(format!("[{}] is not a table", key.table())));
        };
        match value {
            None => {
                section.remove(key.name());
            }
            Some(raw) if key.is_boolean() => {
                let flag: bool = raw
                    .parse()
                    .map_err(|_| StoreError::Config(format!("{key}: expected true or false, got {raw:?}")))?;
                section.insert(key.name().to_string(), Value::Boolean(flag));
            }
            Some(raw) => {
                section.insert(key.name().to_string(), Value::String(raw.to_string()));
            }
        }
        Ok(())
    }

    /// All settable keys that currently have a value.
    pub fn scalars(&self) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        for key in ConfigKey::SCALARS {
            if let Some(value) = self.get(&key) {
                out.insert(key.to_string(), value);
            }
        }
        if let Some(Value::Table(options)) = self.table.get(AUTHENTICATOR_OPTIONS) {
            for name in options.keys() {
                let key = ConfigKey::AuthenticatorOption(name.clone());
                if let Some(value) = self.get(&key) {
                    out.insert(key.to_string(), value);
                }
            }
        }
        out
    }
}
