// src/config/validate.rs

use std::path::{Component, Path};

use crate::config::model::{ConfigFile, GuardSection, RawConfigFile};
use crate::errors::{GuardError, Result};
use crate::guard::spec::check_guard_name;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::GuardError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.install, raw.guard))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_guards(cfg)?;
    for (name, guard) in cfg.guard.iter() {
        check_guard_name(name)?;
        validate_main_file(name, guard)?;
        validate_keywords(name, guard)?;
        validate_startup(name, guard)?;
    }
    Ok(())
}

fn ensure_has_guards(cfg: &RawConfigFile) -> Result<()> {
    if cfg.guard.is_empty() {
        return Err(GuardError::ConfigError(
            "config must contain at least one [guard.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_main_file(name: &str, guard: &GuardSection) -> Result<()> {
    if guard.main_file.trim().is_empty() {
        return Err(GuardError::ConfigError(format!(
            "guard '{}' has an empty `main_file`",
            name
        )));
    }

    let path = Path::new(&guard.main_file);
    let escapes = path.is_absolute()
        || path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
    if escapes {
        return Err(GuardError::ConfigError(format!(
            "guard '{}': `main_file` must be relative to the bin directory (got '{}')",
            name, guard.main_file
        )));
    }
    Ok(())
}

fn validate_keywords(name: &str, guard: &GuardSection) -> Result<()> {
    let lists = [
        ("started_keywords", &guard.started_keywords),
        ("failed_keywords", &guard.failed_keywords),
    ];
    for (field, keywords) in lists {
        if keywords.iter().any(|k| k.is_empty()) {
            return Err(GuardError::ConfigError(format!(
                "guard '{}' has an empty string in `{}` (it would match every line)",
                name, field
            )));
        }
    }
    Ok(())
}

fn validate_startup(name: &str, guard: &GuardSection) -> Result<()> {
    if guard.startup.poll_interval_ms == 0 {
        return Err(GuardError::ConfigError(format!(
            "guard '{}': startup.poll_interval_ms must be >= 1 (got 0)",
            name
        )));
    }
    if guard.startup.max_polls == 0 {
        return Err(GuardError::ConfigError(format!(
            "guard '{}': startup.max_polls must be >= 1 (got 0)",
            name
        )));
    }
    Ok(())
}
