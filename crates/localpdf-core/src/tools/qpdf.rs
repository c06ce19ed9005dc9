//! Password protection through qpdf.
//!
//! qpdf exits 0 on success, 3 when it succeeded with warnings and 2 on
//! errors. A wrong password is an exit 2 with "invalid password" on stderr.

use std::ffi::OsString;
use std::path::Path;

use tracing::{info, warn};

use crate::bridge::{invoke, ProcessOutput, TempFile};
use crate::error::{PdfToolError, Result};
use crate::requests::{EncryptionLevel, LockOptions, UnlockOptions};
use crate::toolbox::ToolConfig;

const EXIT_WARNINGS: i32 = 3;

pub const INCORRECT_PASSWORD: &str = "Incorrect password. Please check the password and try again.";

pub(crate) fn lock_args(input: &Path, output: &Path, options: &LockOptions) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();
    match options.encryption_level {
        // RC4-40 is refused by recent qpdf unless explicitly allowed
        EncryptionLevel::Bits40 => args.push("--allow-weak-crypto".into()),
        EncryptionLevel::Bits128 => {}
    }
    args.push("--encrypt".into());
    args.push(options.open_password.clone().into());
    args.push(options.open_password.clone().into());
    args.push(options.encryption_level.bits().to_string().into());
    if options.encryption_level == EncryptionLevel::Bits128 {
        args.push("--use-aes=y".into());
    }
    args.push("--".into());
    args.push(input.as_os_str().to_owned());
    args.push(output.as_os_str().to_owned());
    args
}

pub(crate) fn unlock_args(input: &Path, output: &Path, options: &UnlockOptions) -> Vec<OsString> {
    let mut password = OsString::from("--password=");
    password.push(&options.password);
    vec![
        password,
        "--decrypt".into(),
        input.as_os_str().to_owned(),
        output.as_os_str().to_owned(),
    ]
}

/// Accept a clean exit or a warnings-only exit.
fn check_exit(output: ProcessOutput) -> Result<()> {
    if output.exit_code == Some(EXIT_WARNINGS) {
        warn!(stderr = %output.stderr.trim(), "qpdf finished with warnings");
        return Ok(());
    }
    if !output.success() && output.stderr.to_ascii_lowercase().contains("invalid password") {
        return Err(PdfToolError::InvalidArgument(INCORRECT_PASSWORD.into()));
    }
    output.ensure_success().map(|_| ())
}

pub async fn lock(config: &ToolConfig, input: &Path, options: &LockOptions) -> Result<Vec<u8>> {
    let output = TempFile::new(&config.temp_dir, "_locked.pdf");
    info!(
        file = %input.display(),
        bits = options.encryption_level.bits(),
        "locking PDF"
    );
    check_exit(invoke(&config.qpdf, lock_args(input, output.path(), options)).await?)?;
    output.read().await
}

pub async fn unlock(config: &ToolConfig, input: &Path, options: &UnlockOptions) -> Result<Vec<u8>> {
    let output = TempFile::new(&config.temp_dir, "_unlocked.pdf");
    info!(file = %input.display(), "unlocking PDF");
    check_exit(invoke(&config.qpdf, unlock_args(input, output.path(), options)).await?)?;
    output.read().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    fn process(exit_code: i32, stderr: &str) -> ProcessOutput {
        ProcessOutput {
            program: "qpdf".into(),
            exit_code: Some(exit_code),
            stdout: Vec::new(),
            stderr: stderr.into(),
        }
    }

    #[test]
    fn test_lock_args_128() {
        let options = LockOptions {
            open_password: "s3cret pass".into(),
            encryption_level: EncryptionLevel::Bits128,
        };
        assert_eq!(
            strings(lock_args(Path::new("in.pdf"), Path::new("out.pdf"), &options)),
            vec![
                "--encrypt",
                "s3cret pass",
                "s3cret pass",
                "128",
                "--use-aes=y",
                "--",
                "in.pdf",
                "out.pdf"
            ]
        );
    }

    #[test]
    fn test_lock_args_40_allows_weak_crypto() {
        let options = LockOptions {
            open_password: "abc".into(),
            encryption_level: EncryptionLevel::Bits40,
        };
        let args = strings(lock_args(Path::new("in.pdf"), Path::new("out.pdf"), &options));
        assert_eq!(args[0], "--allow-weak-crypto");
        assert!(args.contains(&"40".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("--use-aes")));
    }

    #[test]
    fn test_unlock_args() {
        let options = UnlockOptions {
            password: "pw".into(),
        };
        assert_eq!(
            strings(unlock_args(Path::new("in.pdf"), Path::new("out.pdf"), &options)),
            vec!["--password=pw", "--decrypt", "in.pdf", "out.pdf"]
        );
    }

    #[test]
    fn test_exit_codes() {
        assert!(check_exit(process(0, "")).is_ok());
        assert!(check_exit(process(3, "WARNING: damaged xref")).is_ok());
        assert!(matches!(
            check_exit(process(2, "in.pdf: invalid password")),
            Err(PdfToolError::InvalidArgument(msg)) if msg == INCORRECT_PASSWORD
        ));
        assert!(matches!(
            check_exit(process(2, "in.pdf: not a PDF file")),
            Err(PdfToolError::SubprocessFailure(_))
        ));
    }
}
