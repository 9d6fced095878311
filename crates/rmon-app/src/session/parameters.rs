//! Session construction parameters

use std::path::PathBuf;

/// What to open
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionParameters {
    /// A result file on disk
    File(FileSessionParameters),
}

impl SessionParameters {
    /// Shorthand for a file session
    pub fn file(file_name: impl Into<String>, watch: bool) -> Self {
        Self::File(FileSessionParameters::new(file_name, watch))
    }

    /// Name the resulting session will carry
    pub fn name(&self) -> &str {
        match self {
            SessionParameters::File(params) => &params.file_name,
        }
    }
}

/// Parameters of a [`FileSession`](super::FileSession)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSessionParameters {
    /// Path of the result file, as entered. Also the session's display name.
    pub file_name: String,
    /// Start watching right after the first successful read
    pub watch: bool,
}

impl FileSessionParameters {
    pub fn new(file_name: impl Into<String>, watch: bool) -> Self {
        Self {
            file_name: file_name.into(),
            watch,
        }
    }

    pub fn path(&self) -> PathBuf {
        PathBuf::from(&self.file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_shorthand() {
        let params = SessionParameters::file("results/backtest.json", true);
        assert_eq!(params.name(), "results/backtest.json");
        let SessionParameters::File(file) = params;
        assert!(file.watch);
        assert_eq!(file.path(), PathBuf::from("results/backtest.json"));
    }
}
