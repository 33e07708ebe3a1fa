//! elfstrip: strip wrapper for 32-bit ELF objects
//!
//! Clears relocation symbol references in a scratch copy of the input, then
//! invokes the given strip binary on it with the caller's own flags:
//!
//! ```text
//! elfstrip strip_binary <strip options> -o out_file in_file
//! ```

use std::env;
use std::ffi::OsString;
use std::process::ExitCode;

use editelf::strip::USAGE;
use editelf::StripCommand;
use editelf::StripError;

fn main() -> ExitCode {
    env_logger::init();

    let argv: Vec<OsString> = env::args_os().skip(1).collect();
    let command = match StripCommand::from_args(&argv) {
        Ok(command) => command,
        Err(_) => {
            let exe = env::args().next().unwrap_or_else(|| "elfstrip".into());
            eprintln!("Usage: {exe} {USAGE}");
            return ExitCode::FAILURE;
        }
    };

    match command.run() {
        Ok(_) => ExitCode::SUCCESS,
        Err(StripError::Strip { status }) => {
            // Propagate the stripper's own exit code
            match status.code() {
                Some(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
                None => ExitCode::FAILURE,
            }
        }
        Err(err) => {
            eprintln!("elfstrip: {err}");
            ExitCode::FAILURE
        }
    }
}
