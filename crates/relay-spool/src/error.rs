use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpoolError {
    #[error("spool I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("spool entry already exists: {0}")]
    Collision(PathBuf),

    #[error("directory not writable: {0}")]
    NotWritable(PathBuf),
}
