//! Test fixtures: small PDF blobs and multipart forms.

use axum_test::multipart::{MultipartForm, Part};

/// Minimal valid PDF.
pub fn create_test_pdf() -> Vec<u8> {
    b"%PDF-1.4
1 0 obj
<< /Type /Catalog /Pages 2 0 R >>
endobj
2 0 obj
<< /Type /Pages /Kids [3 0 R] /Count 1 >>
endobj
3 0 obj
<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] >>
endobj
xref
0 4
0000000000 65535 f 
0000000009 00000 n 
0000000058 00000 n 
0000000115 00000 n 
trailer
<< /Size 4 /Root 1 0 R >>
startxref
178
%%EOF
"
    .to_vec()
}

/// A PDF header followed by `len` bytes of padding.
pub fn create_padded_pdf(len: usize) -> Vec<u8> {
    let mut data = b"%PDF-1.7\n".to_vec();
    data.resize(data.len() + len, b'0');
    data
}

/// Form with a single `file` part.
pub fn file_form(filename: &str, data: Vec<u8>) -> MultipartForm {
    MultipartForm::new().add_part(
        "file",
        Part::bytes(data)
            .file_name(filename)
            .mime_type("application/pdf"),
    )
}

/// Form with a PDF `file` part and the given presets.
pub fn pdf_form_with_presets(dpi: &str, quality: &str) -> MultipartForm {
    file_form("document.pdf", create_test_pdf())
        .add_text("dpi", dpi)
        .add_text("quality", quality)
}
