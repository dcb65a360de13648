//! Upload validation
//!
//! Pure checks over an in-memory upload. Nothing here touches the filesystem.

use bytes::Bytes;
use std::path::Path;

/// Leading bytes of every PDF document
pub const PDF_MAGIC_BYTES: &[u8] = b"%PDF-";

const ALLOWED_EXTENSION: &str = "pdf";

/// A file received from the client
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: Option<String>,
    pub data: Bytes,
}

impl Upload {
    pub fn new(filename: Option<String>, data: impl Into<Bytes>) -> Self {
        Self {
            filename,
            data: data.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("no file uploaded")]
    NoFile,

    #[error("no file selected")]
    NoFileSelected,

    #[error("only PDF files allowed (got extension '{extension}')")]
    InvalidExtension { extension: String },

    #[error("file too large ({size} bytes, max {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("file is empty")]
    EmptyFile,

    #[error("invalid PDF file")]
    InvalidSignature,
}

impl ValidationError {
    /// Message shown to the end user
    pub fn user_message(&self) -> String {
        match self {
            ValidationError::NoFile => "Keine Datei hochgeladen".to_string(),
            ValidationError::NoFileSelected => "Keine Datei ausgewählt".to_string(),
            ValidationError::InvalidExtension { .. } => "Nur PDF-Dateien sind erlaubt".to_string(),
            ValidationError::FileTooLarge { max, .. } => {
                format!("Datei ist zu groß (max. {} MB)", max / (1024 * 1024))
            }
            ValidationError::EmptyFile => "Datei ist leer".to_string(),
            ValidationError::InvalidSignature => "Ungültige PDF-Datei".to_string(),
        }
    }
}

/// True if `data` starts with the PDF magic bytes.
pub fn has_pdf_signature(data: &[u8]) -> bool {
    data.starts_with(PDF_MAGIC_BYTES)
}

#[derive(Debug, Clone, Copy)]
pub struct PdfValidator {
    max_size_bytes: usize,
}

impl PdfValidator {
    pub fn new(max_size_bytes: usize) -> Self {
        Self { max_size_bytes }
    }

    pub fn max_size_bytes(&self) -> usize {
        self.max_size_bytes
    }

    /// Run every check in order, stopping at the first failure.
    pub fn validate(&self, upload: Option<&Upload>) -> Result<(), ValidationError> {
        let upload = upload.ok_or(ValidationError::NoFile)?;
        let filename = upload.filename.as_deref().unwrap_or_default();

        self.validate_filename(filename)?;
        self.validate_extension(filename)?;
        self.validate_size(upload.size())?;
        self.validate_signature(&upload.data)?;
        Ok(())
    }

    pub fn validate_filename(&self, filename: &str) -> Result<(), ValidationError> {
        if filename.is_empty() {
            return Err(ValidationError::NoFileSelected);
        }
        Ok(())
    }

    pub fn validate_extension(&self, filename: &str) -> Result<(), ValidationError> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();

        if !extension.eq_ignore_ascii_case(ALLOWED_EXTENSION) {
            return Err(ValidationError::InvalidExtension {
                extension: extension.to_lowercase(),
            });
        }
        Ok(())
    }

    /// Upper bound first, then emptiness
    pub fn validate_size(&self, size: usize) -> Result<(), ValidationError> {
        if size > self.max_size_bytes {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_size_bytes,
            });
        }
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }
        Ok(())
    }

    pub fn validate_signature(&self, data: &[u8]) -> Result<(), ValidationError> {
        if !has_pdf_signature(data) {
            return Err(ValidationError::InvalidSignature);
        }
        Ok(())
    }
}
