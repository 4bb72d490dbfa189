use crate::parsers::text::clean_text;
use lopdf::{Document, Object};
use std::path::{Path, PathBuf};
use tokio::task::JoinSet;

/// Extract the text of several PDFs concurrently
///
/// One task is spawned per file and all of them are awaited. The result at
/// index `i` belongs to `paths[i]` whatever order the tasks finish in. A
/// file that cannot be read yields an empty string.
pub async fn extract_texts(paths: &[PathBuf]) -> Vec<String> {
    let mut tasks = JoinSet::new();
    for (index, path) in paths.iter().cloned().enumerate() {
        tasks.spawn_blocking(move || (index, extract_text(&path)));
    }

    let mut texts = vec![String::new(); paths.len()];
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, text)) => texts[index] = text,
            Err(e) => ::log::error!("Text extraction task failed: {}", e),
        }
    }
    texts
}

/// Extract and normalise the text of a single PDF
///
/// Falls back to the document information (title, author, ...) when the
/// pages carry no text. Returns an empty string, after logging, when the
/// file is missing or nothing can be read.
pub fn extract_text(path: &Path) -> String {
    if !path.exists() {
        ::log::error!("PDF file not found: {}", path.display());
        return String::new();
    }

    // pdf-extract panics on some malformed documents
    match std::panic::catch_unwind(|| pdf_extract::extract_text(path)) {
        Ok(Ok(text)) => {
            let text = clean_text(&text);
            if !text.is_empty() {
                return text;
            }
            ::log::warn!("No page text found in {}", path.display());
        }
        Ok(Err(e)) => {
            ::log::warn!("Page text extraction failed for {}: {}", path.display(), e)
        }
        Err(_) => ::log::warn!("Page text extraction panicked for {}", path.display()),
    }

    match metadata_text(path) {
        Ok(text) if !text.is_empty() => {
            ::log::info!("Using document metadata for {}", path.display());
            clean_text(&text)
        }
        Ok(_) => {
            ::log::error!("All text extraction methods failed for {}", path.display());
            String::new()
        }
        Err(e) => {
            ::log::error!("Metadata extraction failed for {}: {}", path.display(), e);
            String::new()
        }
    }
}

/// `Key: value` lines from the document information dictionary
///
/// Entries without a text value are skipped.
pub fn metadata_text(path: &Path) -> Result<String, lopdf::Error> {
    let doc = Document::load(path)?;
    let info = match doc.trailer.get(b"Info") {
        Ok(info) => info,
        Err(_) => return Ok(String::new()),
    };
    let (_, info) = doc.dereference(info)?;
    let info = info.as_dict()?;

    let lines: Vec<String> = info
        .iter()
        .filter_map(|(key, value)| {
            let value = pdf_string(value)?;
            let value = value.trim();
            (!value.is_empty()).then(|| format!("{}: {}", String::from_utf8_lossy(key), value))
        })
        .collect();
    Ok(lines.join("\n"))
}

/// Decode a PDF text string (UTF-16BE with byte order mark, else Latin-1)
fn pdf_string(value: &Object) -> Option<String> {
    let bytes = value.as_str().ok()?;
    match bytes {
        [0xFE, 0xFF, rest @ ..] => {
            let units = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
            Some(
                char::decode_utf16(units)
                    .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
                    .collect(),
            )
        }
        _ => Some(bytes.iter().map(|&b| b as char).collect()),
    }
}
