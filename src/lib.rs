// Library root
// -----------
// The binary (`main.rs`) only forwards argv to `cli::run`; everything else
// lives here so the workflow can be driven from tests.
//
// Module responsibilities:
// - `version`: reads and bumps the version in `info.json`, syncs `mod-list.json`.
// - `archive`: builds `<mod>_<version>.zip` from the mod directory.
// - `ui`: the manual test gate and upload confirmation, plus the spinner.
// - `api`: the mod portal's two-step upload over blocking HTTP.
// - `release`: strings the above together into the release flow.
// - `cli`: argument parsing and exit codes.
pub mod api;
pub mod archive;
pub mod cli;
pub mod config;
pub mod error;
pub mod release;
pub mod ui;
pub mod version;

pub use error::{ReleaseError, Result};
