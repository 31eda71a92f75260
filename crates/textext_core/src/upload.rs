//! File handles picked by the host and their pre-upload checks.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Largest accepted upload, in bytes (10 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// File chosen by the user on the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    pub name: String,
    /// Platform URI or path; opaque to this crate.
    pub uri: String,
    pub size_bytes: u64,
}

/// Rejection raised before any bytes are sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    TooLarge { size: u64, limit: u64 },
    MissingName,
}

impl Display for UploadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooLarge { size, limit } => write!(
                f,
                "file is {} bytes; the upload limit is {} bytes",
                size, limit
            ),
            Self::MissingName => write!(f, "file name must not be blank"),
        }
    }
}

impl Error for UploadError {}

impl FileHandle {
    /// Checks the handle against the upload ceiling.
    pub fn validate(&self) -> Result<(), UploadError> {
        if self.name.trim().is_empty() {
            return Err(UploadError::MissingName);
        }
        if self.size_bytes > MAX_UPLOAD_BYTES {
            return Err(UploadError::TooLarge {
                size: self.size_bytes,
                limit: MAX_UPLOAD_BYTES,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{FileHandle, UploadError, MAX_UPLOAD_BYTES};

    fn handle(size_bytes: u64) -> FileHandle {
        FileHandle {
            name: "lecture-3.pdf".to_string(),
            uri: "content://docs/lecture-3.pdf".to_string(),
            size_bytes,
        }
    }

    #[test]
    fn accepts_exactly_the_limit() {
        assert!(handle(MAX_UPLOAD_BYTES).validate().is_ok());
    }

    #[test]
    fn rejects_one_byte_over() {
        assert_eq!(
            handle(MAX_UPLOAD_BYTES + 1).validate(),
            Err(UploadError::TooLarge {
                size: MAX_UPLOAD_BYTES + 1,
                limit: MAX_UPLOAD_BYTES
            })
        );
    }

    #[test]
    fn rejects_blank_name() {
        let mut file = handle(10);
        file.name = "  ".to_string();
        assert_eq!(file.validate(), Err(UploadError::MissingName));
    }
}
