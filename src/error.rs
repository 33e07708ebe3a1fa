//! Error types for editelf

use std::process::ExitStatus;

use thiserror::Error;

/// Failures while parsing or rewriting an ELF image
///
/// Every variant is fatal for the file being processed: the rewrite is
/// all-or-nothing and nothing is ever auto-corrected or skipped.
#[derive(Error, Debug)]
pub enum ElfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not an ELF image: bad magic {0:02x?}")]
    InvalidFormat([u8; 4]),

    #[error("unsupported ELF {what} (value {value})")]
    UnsupportedFormat { what: &'static str, value: u8 },

    #[error("unsupported layout: {0}")]
    UnsupportedLayout(String),

    #[error("truncated input: needed {needed} bytes at offset {offset}")]
    TruncatedInput { offset: u64, needed: usize },

    #[error("advertised entry size {advertised} does not match record size {expected}")]
    LayoutMismatch { advertised: usize, expected: usize },
}

/// Errors from the strip-wrapper process boundary
#[derive(Error, Debug)]
pub enum StripError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ELF error: {0}")]
    Elf(#[from] ElfError),

    #[error("usage: {0}")]
    Usage(String),

    #[error("strip exited with {status}")]
    Strip { status: ExitStatus },
}
