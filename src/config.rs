//! Scheme layout overrides from a TOML file and the environment.
//!
//! ```toml
//! [scheme.x86_64]
//! page_offset = "0xffff888000000000"
//! phys_base = 0x1000000
//! ```
//!
//! Kernel addresses don't fit TOML's signed integers, so values may also be strings in the same
//! syntax the command line accepts. Environment variables are applied on top of the file.

use std::{
    collections::HashMap,
    env::{self, VarError},
    fs,
    path::{Path, PathBuf},
};

use log::{debug, info, warn};
use nmm::SchemeOverrides;
use toml::{Value, map::Map};

use crate::{cli::parse_u64, error::MmError};

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "MMHELPER_CONFIG";
/// Configuration file picked up from the working directory when nothing else is given.
pub const DEFAULT_CONFIG_FILE: &str = "mmhelper.toml";
/// Environment variable overriding the direct map base.
pub const PAGE_OFFSET_ENV: &str = "MMHELPER_PAGE_OFFSET";
/// Environment variable overriding the kernel image mapping base.
pub const KERNEL_MAP_BASE_ENV: &str = "MMHELPER_KERNEL_MAP_BASE";
/// Environment variable overriding the physical load address of the kernel.
pub const PHYS_BASE_ENV: &str = "MMHELPER_PHYS_BASE";

const PAGE_OFFSET_KEY: &str = "page_offset";
const KERNEL_MAP_BASE_KEY: &str = "kernel_map_base";
const PHYS_BASE_KEY: &str = "phys_base";

/// Overrides collected from every source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    schemes: HashMap<String, SchemeOverrides>,
    env: SchemeOverrides,
}

impl Config {
    /// Loads the configuration file (explicit path, then `$MMHELPER_CONFIG`, then `mmhelper.toml` if present)
    /// and the environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Config, MmError> {
        let mut config = match config_path(path)? {
            Some(path) => {
                let text = fs::read_to_string(&path).map_err(|source| MmError::ConfigRead {
                    path: path.clone(),
                    source,
                })?;
                Config::from_toml(&text, &path)?
            }
            None => Config::default(),
        };
        config.env = overrides_from_env(read_env)?;
        Ok(config)
    }

    /// Parses the `[scheme.<name>]` tables of a configuration file. `path` is only used in errors.
    pub fn from_toml(text: &str, path: &Path) -> Result<Config, MmError> {
        let cfg: Value = toml::from_str(text).map_err(|source| MmError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;

        let mut schemes = HashMap::new();
        let Some(tables) = cfg.get("scheme") else {
            debug!("{} has no [scheme] tables", path.display());
            return Ok(Config::default());
        };
        let tables = tables.as_table().ok_or_else(|| MmError::ConfigValue {
            path: path.to_path_buf(),
            key: "scheme".to_string(),
            reason: "expected a table of schemes".to_string(),
        })?;

        for (name, table) in tables {
            let table = table.as_table().ok_or_else(|| MmError::ConfigValue {
                path: path.to_path_buf(),
                key: format!("scheme.{name}"),
                reason: "expected a table".to_string(),
            })?;
            let overrides = parse_scheme_table(name, table, path)?;
            debug!("Applying {} overrides from {}: {:?}", name, path.display(), overrides);
            schemes.insert(name.clone(), overrides);
        }

        Ok(Config {
            schemes,
            env: SchemeOverrides::default(),
        })
    }

    /// Returns the overrides for the scheme called `name`, with the environment layered on top.
    pub fn overrides_for(&self, name: &str) -> SchemeOverrides {
        let file = self.schemes.get(name).copied().unwrap_or_default();
        file.merge(self.env)
    }
}

fn config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>, MmError> {
    if let Some(path) = explicit {
        return Ok(Some(path.to_path_buf()));
    }
    if let Some(path) = read_env(CONFIG_ENV)? {
        return Ok(Some(PathBuf::from(path)));
    }
    let default = PathBuf::from(DEFAULT_CONFIG_FILE);
    if default.is_file() {
        info!("Using configuration from {}", default.display());
        Ok(Some(default))
    } else {
        Ok(None)
    }
}

fn parse_scheme_table(
    name: &str,
    table: &Map<String, Value>,
    path: &Path,
) -> Result<SchemeOverrides, MmError> {
    let get_key = |key: &str| -> Result<Option<u64>, MmError> {
        let Some(val) = table.get(key) else {
            return Ok(None);
        };
        let invalid = |reason: String| MmError::ConfigValue {
            path: path.to_path_buf(),
            key: format!("scheme.{name}.{key}"),
            reason,
        };
        match val {
            Value::Integer(i) => u64::try_from(*i)
                .map(Some)
                .map_err(|_| invalid(format!("{i} is negative"))),
            Value::String(s) => parse_u64(s).map(Some).map_err(|e| invalid(e.to_string())),
            other => Err(invalid(format!(
                "expected an integer or a string, found {}",
                other.type_str()
            ))),
        }
    };

    for key in table.keys() {
        if ![PAGE_OFFSET_KEY, KERNEL_MAP_BASE_KEY, PHYS_BASE_KEY].contains(&key.as_str()) {
            warn!("Ignoring unknown key scheme.{}.{} in {}", name, key, path.display());
        }
    }

    Ok(SchemeOverrides {
        page_offset: get_key(PAGE_OFFSET_KEY)?,
        kernel_map_base: get_key(KERNEL_MAP_BASE_KEY)?,
        phys_base: get_key(PHYS_BASE_KEY)?,
    })
}

fn read_env(key: &'static str) -> Result<Option<String>, MmError> {
    match env::var(key) {
        Ok(val) => Ok(Some(val)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(_)) => Err(MmError::EnvValue(key, "not valid unicode".to_string())),
    }
}

/// Reads the override variables through `lookup`.
fn overrides_from_env(
    lookup: impl Fn(&'static str) -> Result<Option<String>, MmError>,
) -> Result<SchemeOverrides, MmError> {
    let get_var = |key: &'static str| -> Result<Option<u64>, MmError> {
        match lookup(key)? {
            Some(val) => parse_u64(&val)
                .map(Some)
                .map_err(|e| MmError::EnvValue(key, e.to_string())),
            None => Ok(None),
        }
    };

    Ok(SchemeOverrides {
        page_offset: get_var(PAGE_OFFSET_ENV)?,
        kernel_map_base: get_var(KERNEL_MAP_BASE_ENV)?,
        phys_base: get_var(PHYS_BASE_ENV)?,
    })
}
