//! Baby profile storage.
//!
//! The profile (birth date and sex) anchors every age-dependent
//! computation. It is stored as a small JSON file in the data directory;
//! an absent file simply means no profile has been set yet.

use crate::{BabyProfile, Error, Result};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Load the baby profile from a JSON file.
///
/// Returns None if the file doesn't exist (no profile configured yet).
/// A malformed file is logged and treated as absent rather than aborting
/// every command.
pub fn load_profile(path: &Path) -> Result<Option<BabyProfile>> {
    if !path.exists() {
        tracing::debug!("No profile file found at {:?}", path);
        return Ok(None);
    }

    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            tracing::warn!("Failed to read profile at {:?}: {}. Ignoring.", path, e);
            return Ok(None);
        }
    };

    let profile: BabyProfile = match serde_json::from_str(&contents) {
        Ok(profile) => profile,
        Err(e) => {
            tracing::warn!("Failed to parse profile at {:?}: {}. Ignoring.", path, e);
            return Ok(None);
        }
    };

    tracing::debug!(
        "Loaded profile: born {}, {:?}",
        profile.birth_date,
        profile.sex
    );

    Ok(Some(profile))
}

/// Load the profile, failing with `NotFound` when none is configured.
///
/// Used by commands that cannot proceed without a birth date.
pub fn require_profile(path: &Path) -> Result<BabyProfile> {
    load_profile(path)?.ok_or_else(|| {
        Error::NotFound(format!(
            "no baby profile configured (expected {:?})",
            path
        ))
    })
}

/// Save the profile atomically: write a temp file in the same directory,
/// sync it, then rename over the original.
pub fn save_profile(path: &Path, profile: &BabyProfile) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let temp = NamedTempFile::new_in(path.parent().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::Other, "profile path missing parent")
    })?)?;

    {
        let mut writer = std::io::BufWriter::new(temp.as_file());
        let contents = serde_json::to_string(profile)?;
        writer.write_all(contents.as_bytes())?;
        writer.flush()?;
    }

    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| Error::Io(e.error))?;

    tracing::info!("Saved profile to {:?}", path);
    Ok(())
}
