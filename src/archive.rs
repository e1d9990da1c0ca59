use std::fs;
use std::io;
use std::path::Path;

use zip::ZipArchive;

use crate::error::GenofetchError;

/// Read every entry of the archive to verify it is a well-formed zip.
pub fn validate_zip(zip_path: &Path) -> Result<(), GenofetchError> {
    let file = fs::File::open(zip_path).map_err(|err| {
        GenofetchError::Filesystem(format!("open zip {}: {err}", zip_path.display()))
    })?;
    let mut archive =
        ZipArchive::new(file).map_err(|err| GenofetchError::Filesystem(err.to_string()))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|err| GenofetchError::Filesystem(err.to_string()))?;
        if entry.is_dir() {
            continue;
        }
        io::copy(&mut entry, &mut io::sink())
            .map_err(|err| GenofetchError::Filesystem(err.to_string()))?;
    }
    Ok(())
}
