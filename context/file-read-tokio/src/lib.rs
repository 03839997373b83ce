//! Tokio-based file reading for eslog.
//!
//! `TokioFileRead` implements [`FileRead`] on top of `tokio::fs`, which is
//! what the AWS profile providers use to read `~/.aws/config` and
//! `~/.aws/credentials`.
//!
//! ```no_run
//! use eslog_core::{Context, OsEnv};
//! use eslog_file_read_tokio::TokioFileRead;
//!
//! # async fn example() -> eslog_core::Result<()> {
//! let ctx = Context::new().with_file_read(TokioFileRead).with_env(OsEnv);
//! let content = ctx.file_read_as_string("/etc/hosts").await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use eslog_core::{Error, FileRead, Result};

/// Tokio-based implementation of the `FileRead` trait.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFileRead;

#[async_trait]
impl FileRead for TokioFileRead {
    async fn file_read(&self, path: &str) -> Result<Vec<u8>> {
        tokio::fs::read(path).await.map_err(|e| {
            Error::unexpected("failed to read file")
                .with_source(e)
                .with_context(format!("path: {path}"))
        })
    }
}
