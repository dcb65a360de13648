//! pdfpress processing
//!
//! The request pipeline's building blocks: upload validation, the temp-file store
//! and the external compressor.

pub mod compressor;
pub mod temp_store;
pub mod validator;

pub use compressor::{
    compress_to_memory, qfactor_for_quality, CompressedPdf, CompressionError,
    GhostscriptCompressor, PdfCompressor,
};
pub use temp_store::{TempFilePair, TempStore};
pub use validator::{has_pdf_signature, PdfValidator, Upload, ValidationError, PDF_MAGIC_BYTES};
