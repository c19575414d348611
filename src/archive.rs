// Archiver: copies a mod directory into a version-stamped sibling, zips that
// copy and removes it again, leaving `<name>_<version>.zip` behind.

use crate::error::{ReleaseError, Result};
use crate::version::ModVersion;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Literal text in the mod path that gets replaced by the real version.
pub const VERSION_PLACEHOLDER: &str = "0.0.0";

/// Directory names skipped at any depth when copying: VCS and editor metadata, test fixtures.
pub const EXCLUDED_NAMES: &[&str] = &[".git", ".idea", ".vscode", "tests"];

/// Destination of the versioned copy: every `0.0.0` in the path replaced by
/// `version`. A path without the placeholder maps onto itself.
pub fn versioned_path(mod_path: &Path, version: &ModVersion) -> Result<PathBuf> {
    let raw = mod_path.to_str().ok_or_else(|| {
        ReleaseError::filesystem(
            format!("stamping {}", mod_path.display()),
            io::Error::new(io::ErrorKind::InvalidInput, "path is not valid UTF-8"),
        )
    })?;
    // Re-collecting the components drops a trailing separator (`mymod_0.0.0/`).
    Ok(Path::new(&raw.replace(VERSION_PLACEHOLDER, &version.to_string()))
        .components()
        .collect())
}

/// Build the release archive for `mod_path` at `version` and return its path.
pub fn package(mod_path: &Path, version: &ModVersion) -> Result<PathBuf> {
    if !mod_path.is_dir() {
        return Err(ReleaseError::NotFound {
            path: mod_path.to_path_buf(),
        });
    }

    let stamped = versioned_path(mod_path, version)?;
    if stamped.exists() {
        // Also the case when the placeholder is missing and stamped == mod_path.
        return Err(ReleaseError::filesystem(
            format!("copying {} to {}", mod_path.display(), stamped.display()),
            io::Error::new(io::ErrorKind::AlreadyExists, "destination already exists"),
        ));
    }

    copy_tree(mod_path, &stamped).map_err(|e| {
        ReleaseError::filesystem(
            format!("copying {} to {}", mod_path.display(), stamped.display()),
            e,
        )
    })?;
    log::debug!("copied {} to {}", mod_path.display(), stamped.display());

    let archive = archive_path(&stamped);
    let zipped = zip_dir(&stamped, &archive).map_err(|e| {
        let _ = fs::remove_file(&archive);
        ReleaseError::filesystem(format!("writing {}", archive.display()), e)
    });
    let removed = fs::remove_dir_all(&stamped).map_err(|e| {
        ReleaseError::filesystem(format!("removing {}", stamped.display()), e)
    });

    match (zipped, removed) {
        (Ok(()), Ok(())) => Ok(archive),
        (Err(e), Err(cleanup)) => {
            log::warn!("{}", cleanup);
            Err(e)
        }
        (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
    }
}

fn archive_path(stamped: &Path) -> PathBuf {
    // Not `with_extension`: `mymod_1.0.0` already has an "extension" of `0`.
    let mut name = stamped
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(".zip");
    match stamped.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}

fn is_excluded(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map(|name| EXCLUDED_NAMES.contains(&name))
            .unwrap_or(false)
}

fn copy_tree(src: &Path, dest: &Path) -> io::Result<()> {
    fs::create_dir_all(dest)?;
    let walker = WalkDir::new(src)
        .min_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| !is_excluded(e));
    for entry in walker {
        let entry = entry?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(io::Error::other)?;
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

fn zip_entry_name(base: &str, rel: &Path) -> String {
    let mut name = base.to_string();
    for part in rel.components() {
        name.push('/');
        name.push_str(&part.as_os_str().to_string_lossy());
    }
    name
}

/// Zip `dir` into `archive` with `dir`'s own name as the single top-level folder.
fn zip_dir(dir: &Path, archive: &Path) -> io::Result<()> {
    let base = dir
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "directory has no name"))?;

    let mut zip = ZipWriter::new(File::create(archive)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.add_directory(format!("{}/", base), options)
        .map_err(io::Error::other)?;
    for entry in WalkDir::new(dir).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        let rel = entry
            .path()
            .strip_prefix(dir)
            .map_err(io::Error::other)?;
        let name = zip_entry_name(&base, rel);
        if entry.file_type().is_dir() {
            zip.add_directory(format!("{}/", name), options)
                .map_err(io::Error::other)?;
        } else {
            log::debug!("adding {}", name);
            zip.start_file(name, options).map_err(io::Error::other)?;
            let mut file = File::open(entry.path())?;
            io::copy(&mut file, &mut zip)?;
        }
    }
    zip.finish().map_err(io::Error::other)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::io::Read;
    use tempfile::TempDir;
    use zip::ZipArchive;

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn sample_mod(root: &Path) -> PathBuf {
        let dir = root.join("mymod_0.0.0");
        write(&dir.join("info.json"), r#"{"name": "mymod", "version": "1.0.0"}"#);
        write(&dir.join("control.lua"), "script.on_init(function() end)\n");
        write(&dir.join("locale/en/strings.cfg"), "[mod-name]\nmymod=My Mod\n");
        write(&dir.join(".git/HEAD"), "ref: refs/heads/main\n");
        write(&dir.join(".idea/workspace.xml"), "<project/>\n");
        write(&dir.join("tests/fixture.lua"), "return {}\n");
        write(&dir.join("prototypes/tests/keep.lua"), "-- nested name is excluded too\n");
        write(&dir.join("scripts/tests"), "-- a file, not a fixture directory\n");
        dir
    }

    #[test]
    fn stamps_every_placeholder_in_the_path() {
        let version = ModVersion::new(1, 2, 3);
        assert_eq!(
            versioned_path(Path::new("/mods/mymod_0.0.0"), &version).unwrap(),
            PathBuf::from("/mods/mymod_1.2.3")
        );
        assert_eq!(
            versioned_path(Path::new("/0.0.0/mymod_0.0.0"), &version).unwrap(),
            PathBuf::from("/1.2.3/mymod_1.2.3")
        );
        assert_eq!(
            versioned_path(Path::new("/mods/mymod"), &version).unwrap(),
            PathBuf::from("/mods/mymod")
        );
    }

    #[test]
    fn package_builds_zip_and_removes_copy() {
        let root = TempDir::new().unwrap();
        let src = sample_mod(root.path());

        let archive = package(&src, &ModVersion::new(1, 0, 0)).unwrap();

        assert_eq!(archive, root.path().join("mymod_1.0.0.zip"));
        assert!(archive.is_file());
        assert!(!root.path().join("mymod_1.0.0").exists());
        assert!(src.join(".git/HEAD").is_file(), "source must be untouched");

        let mut zip = ZipArchive::new(File::open(&archive).unwrap()).unwrap();
        let names: BTreeSet<String> = zip.file_names().map(str::to_string).collect();
        let files: BTreeSet<&str> = names.iter().map(String::as_str).filter(|n| !n.ends_with('/')).collect();
        assert_eq!(
            files,
            BTreeSet::from([
                "mymod_1.0.0/control.lua",
                "mymod_1.0.0/info.json",
                "mymod_1.0.0/locale/en/strings.cfg",
                "mymod_1.0.0/scripts/tests",
            ])
        );
        assert!(names.contains("mymod_1.0.0/"));
        assert!(names.contains("mymod_1.0.0/locale/en/"));
        assert!(names.iter().all(|n| n.starts_with("mymod_1.0.0/")));

        let mut info = String::new();
        zip.by_name("mymod_1.0.0/info.json")
            .unwrap()
            .read_to_string(&mut info)
            .unwrap();
        assert_eq!(info, r#"{"name": "mymod", "version": "1.0.0"}"#);
    }

    #[test]
    fn missing_placeholder_fails_without_touching_source() {
        let root = TempDir::new().unwrap();
        let src = root.path().join("mymod");
        write(&src.join("info.json"), r#"{"version": "1.0.0"}"#);

        let err = package(&src, &ModVersion::new(1, 0, 0)).unwrap_err();

        assert!(matches!(err, ReleaseError::Filesystem { .. }), "{:?}", err);
        assert!(src.join("info.json").is_file());
        assert!(!root.path().join("mymod.zip").exists());
    }

    #[test]
    fn leftover_copy_blocks_packaging() {
        let root = TempDir::new().unwrap();
        let src = sample_mod(root.path());
        fs::create_dir(root.path().join("mymod_1.0.0")).unwrap();

        assert!(matches!(
            package(&src, &ModVersion::new(1, 0, 0)),
            Err(ReleaseError::Filesystem { .. })
        ));
        assert!(!root.path().join("mymod_1.0.0.zip").exists());
    }

    #[test]
    fn trailing_separator_puts_zip_next_to_copy() {
        let root = TempDir::new().unwrap();
        sample_mod(root.path());
        let with_slash = PathBuf::from(format!("{}/", root.path().join("mymod_0.0.0").display()));

        let archive = package(&with_slash, &ModVersion::new(1, 0, 0)).unwrap();

        assert_eq!(archive, root.path().join("mymod_1.0.0.zip"));
        assert!(archive.is_file());
        assert!(!root.path().join("mymod_1.0.0").exists());
    }

    #[test]
    fn failed_zip_leaves_no_copy_and_no_zip() {
        let root = TempDir::new().unwrap();
        let src = sample_mod(root.path());
        // A directory where the archive should go makes File::create fail.
        fs::create_dir(root.path().join("mymod_1.0.0.zip")).unwrap();

        let err = package(&src, &ModVersion::new(1, 0, 0)).unwrap_err();

        assert!(matches!(err, ReleaseError::Filesystem { .. }), "{:?}", err);
        assert!(!root.path().join("mymod_1.0.0").exists());
        assert!(!root.path().join("mymod_1.0.0.zip").is_file());
        assert!(src.join("info.json").is_file());
    }

    #[test]
    fn missing_source_is_not_found() {
        let root = TempDir::new().unwrap();
        assert!(matches!(
            package(&root.path().join("gone_0.0.0"), &ModVersion::new(1, 0, 0)),
            Err(ReleaseError::NotFound { .. })
        ));
    }
}
