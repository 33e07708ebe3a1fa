//! Strip-wrapper process boundary
//!
//! The external strip executable is treated as a black box: the caller's
//! flags are passed through verbatim, with the trailing input file replaced
//! by a scratch copy whose relocation entries no longer reference the symbol
//! table. The original input is never written to, and the scratch file is
//! removed on every exit path.

use std::ffi::OsStr;
use std::ffi::OsString;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::process::Command;
use std::process::ExitStatus;

use log::debug;
use tempfile::NamedTempFile;

use crate::elf::clear_symbol_references;
use crate::error::StripError;

/// Argument shape this wrapper accepts, also printed on a usage error
pub const USAGE: &str = "strip_binary <strip options> -o out_file in_file";

/// A validated strip invocation: `<program> <flags...> -o <out> <input>`
///
/// `flags` holds everything between the program and the input file,
/// including `-o <out>`, and is never interpreted beyond locating the
/// trailing input argument.
#[derive(Debug)]
pub struct StripCommand {
    program: OsString,
    flags: Vec<OsString>,
    input: PathBuf,
}

impl StripCommand {
    /// Validate a raw argument vector (program name excluded)
    ///
    /// Many input files without `-o` is not supported by this wrapper, so
    /// `-o` must appear before the final output/input pair.
    pub fn from_args(argv: &[OsString]) -> Result<Self, StripError> {
        if argv.len() < 4 {
            return Err(StripError::Usage(USAGE.into()));
        }
        if argv[0].to_string_lossy().starts_with('-') {
            return Err(StripError::Usage(USAGE.into()));
        }
        if !argv[1..argv.len() - 2]
            .iter()
            .any(|arg| arg.as_os_str() == OsStr::new("-o"))
        {
            return Err(StripError::Usage(USAGE.into()));
        }

        Ok(Self {
            program: argv[0].clone(),
            flags: argv[1..argv.len() - 1].to_vec(),
            input: PathBuf::from(&argv[argv.len() - 1]),
        })
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    pub fn input(&self) -> &std::path::Path {
        &self.input
    }

    /// Rewrite the input into a scratch file and hand it to the stripper
    ///
    /// Any parse failure aborts before the external executable runs, leaving
    /// the original input untouched.
    pub fn run(&self) -> Result<ExitStatus, StripError> {
        let mut scratch = NamedTempFile::new()?;
        {
            let file = scratch.as_file_mut();
            let mut input = File::open(&self.input)?;
            io::copy(&mut input, file)?;
            let cleared = clear_symbol_references(file)?;
            debug!(
                "cleared {} symbol references from {}",
                cleared,
                self.input.display()
            );
        }

        let status = Command::new(&self.program)
            .args(&self.flags)
            .arg(scratch.path())
            .status()?;
        if !status.success() {
            return Err(StripError::Strip { status });
        }
        Ok(status)
    }
}
