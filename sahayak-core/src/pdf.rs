//! PDF text extraction.
//!
//! Thin wrapper over the `pdf-extract` crate; everything interesting about
//! PDF parsing is delegated to it.

use crate::error::CorpusError;
use std::path::Path;

/// Extract the full text of a PDF file.
pub fn extract_text(path: &Path) -> Result<String, CorpusError> {
    pdf_extract::extract_text(path).map_err(|e| CorpusError::PdfParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Test-only generator for small single-page PDFs with extractable text.
#[cfg(test)]
pub(crate) mod test_pdf {
    use std::path::Path;

    /// Write a minimal one-page PDF rendering `text` (ASCII, one line per
    /// input line) to `path`.
    pub(crate) fn write_minimal_pdf(path: &Path, text: &str) -> std::io::Result<()> {
        let mut content = String::from("BT\n/F1 12 Tf\n14 TL\n50 750 Td\n");
        for line in text.lines() {
            let escaped = line
                .replace('\\', "\\\\")
                .replace('(', "\\(")
                .replace(')', "\\)");
            content.push_str(&format!("({escaped}) Tj\nT*\n"));
        }
        content.push_str("ET");

        let objects = [
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
             /Resources << /Font << /F1 4 0 R >> >> /Contents 5 0 R >>"
                .to_string(),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica \
             /Encoding /WinAnsiEncoding >>"
                .to_string(),
            format!(
                "<< /Length {} >>\nstream\n{}\nendstream",
                content.len(),
                content
            ),
        ];

        let mut pdf = String::from("%PDF-1.4\n");
        let mut offsets = Vec::new();
        for (i, object) in objects.iter().enumerate() {
            offsets.push(pdf.len());
            pdf.push_str(&format!("{} 0 obj\n{}\nendobj\n", i + 1, object));
        }
        let xref_offset = pdf.len();
        pdf.push_str(&format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1));
        for offset in &offsets {
            pdf.push_str(&format!("{offset:010} 00000 n \n"));
        }
        pdf.push_str(&format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_offset
        ));

        std::fs::write(path, pdf)
    }
}
