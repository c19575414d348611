// Release flow: package, bump, gate, upload. Every step blocks and the
// first failure ends the run.

use crate::api::Registry;
use crate::archive;
use crate::error::{ReleaseError, Result};
use crate::ui::{self, Prompt};
use crate::version::{self, ModVersion};
use std::path::{Path, PathBuf};

/// How a release ended when nothing went wrong technically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// Archive pushed; `response` is the registry's reply, verbatim.
    Uploaded { archive: PathBuf, response: String },
    /// Test gate declined. The version bump was reverted.
    TestsDeclined { archive: PathBuf },
    /// Upload gate declined. The bumped version stays.
    UploadCanceled { archive: PathBuf },
}

impl ReleaseOutcome {
    pub fn archive(&self) -> &Path {
        match self {
            ReleaseOutcome::Uploaded { archive, .. }
            | ReleaseOutcome::TestsDeclined { archive }
            | ReleaseOutcome::UploadCanceled { archive } => archive,
        }
    }

    pub fn is_uploaded(&self) -> bool {
        matches!(self, ReleaseOutcome::Uploaded { .. })
    }
}

/// Release the mod at `mod_path`.
///
/// The archive is built from the version found in `info.json`. Right after
/// that the patch number in `info.json` is bumped so the next archive cannot
/// reuse the version; the bump is undone if the test gate is declined and is
/// kept otherwise. A crash between bump and rollback leaves the bump in place.
/// `mod-list.json` is only pointed at the packaged version once the test gate
/// has passed, so a declined release leaves it alone.
pub fn release(
    mod_path: &Path,
    prompt: &mut dyn Prompt,
    registry: &dyn Registry,
) -> Result<ReleaseOutcome> {
    if !mod_path.is_dir() {
        return Err(ReleaseError::NotFound {
            path: mod_path.to_path_buf(),
        });
    }

    let current = version::read_version(mod_path)?;
    let archive = archive::package(mod_path, &current)?;
    println!("Created {}", archive.display());

    let next = current.bump_patch();
    version::write_version(mod_path, &next)?;
    log::debug!("bumped {} from {} to {}", mod_path.display(), current, next);

    let tested = match ui::confirm_tested(prompt) {
        Ok(tested) => tested,
        Err(e) => {
            rollback(mod_path, &current)?;
            return Err(e);
        }
    };
    if !tested {
        rollback(mod_path, &current)?;
        return Ok(ReleaseOutcome::TestsDeclined { archive });
    }

    if version::sync_mod_list_version(mod_path, &current)? {
        println!("Updated {} in {}", version::mod_name(mod_path), version::MOD_LIST_FILE);
    }

    upload(&archive, prompt, registry)
}

fn rollback(mod_path: &Path, original: &ModVersion) -> Result<()> {
    version::write_version(mod_path, original)?;
    log::debug!("restored {} to {}", mod_path.display(), original);
    Ok(())
}

/// Ask the registry for an upload URL, confirm the file name, push it.
pub fn upload(
    archive: &Path,
    prompt: &mut dyn Prompt,
    registry: &dyn Registry,
) -> Result<ReleaseOutcome> {
    let file_name = archive
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let upload_url = registry.init_upload(&version::mod_name(archive))?;

    if !ui::confirm_upload(prompt, &file_name)? {
        return Ok(ReleaseOutcome::UploadCanceled {
            archive: archive.to_path_buf(),
        });
    }

    let progress = ui::spinner(format!("Uploading {}...", file_name));
    let pushed = registry.push_archive(&upload_url, archive);
    progress.finish_and_clear();
    let response = pushed?;
    println!("{}", response);

    Ok(ReleaseOutcome::Uploaded {
        archive: archive.to_path_buf(),
        response,
    })
}

/// The `test` command: only the manual gate.
pub fn test(prompt: &mut dyn Prompt) -> Result<bool> {
    ui::confirm_tested(prompt)
}
