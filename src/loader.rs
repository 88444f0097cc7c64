//! Flat binary loading: copy a raw program image into RAM unchanged,
//! with no header or relocation step.

use std::path::Path;

use thiserror::Error;

use crate::memory::{Memory, MemoryFault};

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("failed to read program image {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to load program image into memory: {0}")]
    Memory(#[from] MemoryFault),
}

/// Read `path` and copy its bytes into `mem` starting at `load_addr`.
/// Returns the number of bytes written. A program that does not fit
/// the destination region is truncated rather than silently dropped.
pub fn load_flat_binary(mem: &mut Memory, path: &Path, load_addr: u64) -> Result<usize, LoaderError> {
    let bytes = std::fs::read(path).map_err(|source| LoaderError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let mut written = 0;
    for (offset, byte) in bytes.iter().enumerate() {
        let addr = load_addr.wrapping_add(offset as u64);
        match mem.write_byte(addr, *byte) {
            Ok(()) => written += 1,
            Err(_) => break,
        }
    }
    Ok(written)
}
