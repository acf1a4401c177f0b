use std::fs;
use std::path::{Path, PathBuf};

use crate::exit::{io_error, CliError, CliResult, USAGE};

/// Create `dir` and any missing parents. Existing directories are fine.
pub fn ensure_dir(dir: &Path) -> CliResult<()> {
    if dir.exists() && !dir.is_dir() {
        return Err(CliError::new(
            USAGE,
            format!("{} exists and is not a directory", dir.display()),
        ));
    }
    fs::create_dir_all(dir)
        .map_err(|err| io_error(&format!("failed creating {}", dir.display()), err))
}

/// Write one payload as `frame-NNNNNN.bin` under `dir` and return its path.
pub fn store_payload(dir: &Path, seq: u64, payload: &[u8]) -> CliResult<PathBuf> {
    let path = dir.join(format!("frame-{seq:06}.bin"));
    fs::write(&path, payload)
        .map_err(|err| io_error(&format!("failed writing {}", path.display()), err))?;
    Ok(path)
}
