//! Text extraction from uploaded files (PDF and plain text).

use tracing::{debug, instrument};

use crate::error::{AssistantError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileKind {
  Pdf,
  Txt,
}

impl FileKind {
  /// Derive the kind from a filename extension (case-insensitive).
  pub fn from_filename(name: &str) -> Result<Self> {
    let ext = name.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase()).unwrap_or_default();
    match ext.as_str() {
      "pdf" => Ok(FileKind::Pdf),
      "txt" => Ok(FileKind::Txt),
      "" => Err(AssistantError::UnsupportedFileType(format!("'{name}' has no extension"))),
      other => Err(AssistantError::UnsupportedFileType(format!(".{other}"))),
    }
  }
}

/// Extract UTF-8 text. Blank or whitespace-only output is `EmptyExtraction`.
#[instrument(level = "info", skip(bytes), fields(bytes_len = bytes.len()))]
pub fn extract(bytes: &[u8], kind: FileKind) -> Result<String> {
  let text = match kind {
    FileKind::Pdf => pdf_extract::extract_text_from_mem(bytes)
      .map_err(|e| AssistantError::ExtractionFailed(format!("PDF: {e}")))?,
    FileKind::Txt => String::from_utf8(bytes.to_vec())
      .map_err(|e| AssistantError::ExtractionFailed(format!("text is not valid UTF-8: {e}")))?,
  };
  if text.trim().is_empty() {
    return Err(AssistantError::EmptyExtraction);
  }
  debug!(text_len = text.len(), "Text extracted");
  Ok(text)
}
