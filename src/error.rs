//! Application-level error carried to `main`.
//!
//! Exit codes:
//! - `2` input/usage problems (missing files, bad columns, bad flags)
//! - `3` no usable data after loading
//! - `4` runtime/output failures (exports, debug bundle, network)

use crate::io::ingest::LoadError;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<LoadError> for AppError {
    fn from(err: LoadError) -> Self {
        AppError::new(err.exit_code(), format!("Load failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_errors_keep_their_exit_code() {
        let err: AppError = LoadError::NoValidRows { rows_read: 7 }.into();
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().contains("7 row(s) read"));

        let err: AppError = LoadError::MissingColumn {
            source_name: "part_0.csv".to_string(),
            column: "sector".to_string(),
        }
        .into();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("`sector`"));
    }
}
