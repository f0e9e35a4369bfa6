//! Final ALLIUM matrix and removal of intermediate files

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::data::ExpressionMatrix;
use crate::error::Result;
use crate::io::write_sample_major;

/// Write the sample x gene matrix consumed by ALLIUM (`id` index column)
pub fn format_for_allium<P: AsRef<Path>>(path: P, expression: &ExpressionMatrix) -> Result<()> {
    let path = path.as_ref();
    write_sample_major(path, expression)?;
    log::info!(
        "Wrote {} samples x {} genes to {}",
        expression.n_samples(),
        expression.n_genes(),
        path.display()
    );
    Ok(())
}

/// Delete intermediate files; paths that do not exist are skipped
///
/// Returns the number of files removed.
pub fn cleanup_intermediates(paths: &[PathBuf]) -> Result<usize> {
    let mut removed = 0;
    for path in paths {
        match std::fs::remove_file(path) {
            Ok(()) => {
                log::debug!("Removed {}", path.display());
                removed += 1;
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(removed)
}
