// Version store: reads and rewrites the `version` field of a mod's
// `info.json`, and keeps the sibling `mod-list.json` in step with it.

use crate::error::{ReleaseError, Result};
use serde_json::Value;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tempfile::NamedTempFile;

pub const INFO_FILE: &str = "info.json";
pub const MOD_LIST_FILE: &str = "mod-list.json";

/// A `major.minor.patch` mod version. Only the patch part is ever bumped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl ModVersion {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        ModVersion {
            major,
            minor,
            patch,
        }
    }

    pub fn bump_patch(&self) -> Self {
        ModVersion {
            patch: self.patch.saturating_add(1),
            ..*self
        }
    }
}

impl fmt::Display for ModVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseVersionError(String);

impl fmt::Display for ParseVersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}` is not a version of the form a.b.c", self.0)
    }
}

impl std::error::Error for ParseVersionError {}

impl FromStr for ModVersion {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let err = || ParseVersionError(s.to_string());
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 3 {
            return Err(err());
        }
        let mut numbers = [0u64; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            // u64::from_str would also take a leading '+'
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(err());
            }
            *slot = part.parse().map_err(|_| err())?;
        }
        Ok(ModVersion::new(numbers[0], numbers[1], numbers[2]))
    }
}

/// Name of a mod as the portal knows it: the file name of `path` up to the
/// first underscore. `mymod_1.2.3.zip` and `mymod_0.0.0` both give `mymod`.
pub fn mod_name(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    match file_name.split_once('_') {
        Some((name, _)) => name.to_string(),
        None => file_name,
    }
}

fn info_path(mod_path: &Path) -> Result<PathBuf> {
    if !mod_path.is_dir() {
        return Err(ReleaseError::NotFound {
            path: mod_path.to_path_buf(),
        });
    }
    let info = mod_path.join(INFO_FILE);
    if !info.is_file() {
        return Err(ReleaseError::NotFound { path: info });
    }
    Ok(info)
}

fn read_json(path: &Path) -> Result<Value> {
    let raw = fs::read_to_string(path)
        .map_err(|e| ReleaseError::filesystem(format!("reading {}", path.display()), e))?;
    serde_json::from_str(&raw).map_err(|e| ReleaseError::malformed(path, e.to_string()))
}

/// Replace `path` with the pretty-printed `value`. The data goes to a temp
/// file in the same directory first, so a crash never leaves half a file.
fn write_json(path: &Path, value: &Value) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut text = serde_json::to_string_pretty(value)
        .map_err(|e| ReleaseError::malformed(path, e.to_string()))?;
    text.push('\n');

    let context = || format!("writing {}", path.display());
    let mut tmp =
        NamedTempFile::new_in(dir).map_err(|e| ReleaseError::filesystem(context(), e))?;
    if let Ok(meta) = fs::metadata(path) {
        if let Err(e) = tmp.as_file().set_permissions(meta.permissions()) {
            log::debug!("could not copy permissions of {}: {}", path.display(), e);
        }
    }
    tmp.write_all(text.as_bytes())
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| ReleaseError::filesystem(context(), e))?;
    tmp.persist(path)
        .map_err(|e| ReleaseError::filesystem(context(), e.error))?;
    Ok(())
}

/// Read the version from `<mod_path>/info.json`.
pub fn read_version(mod_path: &Path) -> Result<ModVersion> {
    let info = info_path(mod_path)?;
    let data = read_json(&info)?;
    let raw = data
        .get("version")
        .ok_or_else(|| ReleaseError::malformed(&info, "missing `version` field"))?
        .as_str()
        .ok_or_else(|| ReleaseError::malformed(&info, "`version` is not a string"))?;
    raw.parse()
        .map_err(|e: ParseVersionError| ReleaseError::malformed(&info, e.to_string()))
}

/// Rewrite the `version` field of `<mod_path>/info.json`, keeping every other
/// field and the key order as they were.
pub fn write_version(mod_path: &Path, version: &ModVersion) -> Result<()> {
    let info = info_path(mod_path)?;
    let mut data = read_json(&info)?;
    let object = data
        .as_object_mut()
        .ok_or_else(|| ReleaseError::malformed(&info, "expected a JSON object"))?;
    object.insert("version".to_string(), Value::String(version.to_string()));
    write_json(&info, &data)?;
    log::debug!("wrote version {} to {}", version, info.display());
    Ok(())
}

/// Set the version of this mod's entry in the `mod-list.json` next to the
/// mod directory. Returns `Ok(false)` when there is no such file or no entry
/// with a matching name; only the first matching entry is changed.
pub fn sync_mod_list_version(mod_path: &Path, version: &ModVersion) -> Result<bool> {
    let parent = match mod_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let list_path = parent.join(MOD_LIST_FILE);
    if !list_path.is_file() {
        log::debug!("no {} found, skipping sync", list_path.display());
        return Ok(false);
    }

    let name = mod_name(mod_path);
    let mut data = read_json(&list_path)?;
    let mods = data
        .get_mut("mods")
        .and_then(Value::as_array_mut)
        .ok_or_else(|| ReleaseError::malformed(&list_path, "missing `mods` array"))?;

    let entry = mods
        .iter_mut()
        .find(|entry| entry.get("name").and_then(Value::as_str) == Some(name.as_str()));
    match entry.and_then(Value::as_object_mut) {
        Some(entry) => {
            entry.insert("version".to_string(), Value::String(version.to_string()));
        }
        None => {
            log::debug!("{} has no entry for {}", list_path.display(), name);
            return Ok(false);
        }
    }

    write_json(&list_path, &data)?;
    log::debug!("set {} to {} in {}", name, version, list_path.display());
    Ok(true)
}
