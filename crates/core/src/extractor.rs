use crate::error::IngestError;
use crate::traits::PdfTextExtractor;
use lopdf::{dictionary, Document, Stream};
use tracing::{debug, warn};

// lopdf parses arrays, dictionaries and strings recursively.
const MAX_PDF_NESTING: usize = 256;

#[derive(Debug, Clone, Default)]
pub struct LopdfExtractor;

impl PdfTextExtractor for LopdfExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, IngestError> {
        reject_deep_nesting(bytes)?;
        let document =
            Document::load_mem(bytes).map_err(|error| IngestError::PdfParse(error.to_string()))?;

        let mut pages = Vec::new();
        for (page_no, page_id) in document.get_pages() {
            if let Ok(content) = document.get_page_content(page_id) {
                reject_deep_nesting(&content)?;
            }

            let text = document
                .extract_text(&[page_no])
                .map_err(|error| IngestError::PdfParse(error.to_string()))?;

            if !text.trim().is_empty() {
                pages.push(text);
            }
        }

        if pages.is_empty() {
            return Err(IngestError::PdfParse(
                "pdf had no readable page text".to_string(),
            ));
        }

        Ok(pages.join("\n"))
    }
}

fn reject_deep_nesting(bytes: &[u8]) -> Result<(), IngestError> {
    let depth = nesting_depth(bytes);
    if depth > MAX_PDF_NESTING {
        warn!(target: "security", depth, limit = MAX_PDF_NESTING, "pdf object nesting too deep");
        return Err(IngestError::PdfParse(format!(
            "object nesting depth {depth} exceeds {MAX_PDF_NESTING}"
        )));
    }
    Ok(())
}

// Deepest `[`/`<<`/`(` nesting outside comments. Stream bodies are skipped,
// except object streams, which lopdf parses while loading.
fn nesting_depth(bytes: &[u8]) -> usize {
    scan_depth(bytes, true)
}

fn scan_depth(bytes: &[u8], expand_object_streams: bool) -> usize {
    let mut depth = 0usize;
    let mut deepest = 0usize;
    let mut index = 0usize;

    while index < bytes.len() {
        match bytes[index] {
            b'[' => {
                depth += 1;
                deepest = deepest.max(depth);
            }
            b']' => depth = depth.saturating_sub(1),
            b'<' if bytes.get(index + 1) == Some(&b'<') => {
                depth += 1;
                deepest = deepest.max(depth);
                index += 1;
            }
            b'>' if bytes.get(index + 1) == Some(&b'>') => {
                depth = depth.saturating_sub(1);
                index += 1;
            }
            b'(' => {
                let (end, parens) = skip_literal_string(bytes, index);
                deepest = deepest.max(depth + parens);
                index = end;
                continue;
            }
            b'%' => {
                index = skip_line(bytes, index);
                continue;
            }
            b's' if starts_keyword(bytes, index, b"stream") => {
                let body_start = stream_body_start(bytes, index + b"stream".len());
                let Some(length) = find(&bytes[body_start..], b"endstream") else {
                    break;
                };
                if expand_object_streams {
                    let header = stream_header(bytes, index);
                    if header.windows(7).any(|window| window == b"/ObjStm") {
                        let body = &bytes[body_start..body_start + length];
                        deepest = deepest.max(object_stream_depth(header, body));
                    }
                }
                index = body_start + length + b"endstream".len();
                continue;
            }
            _ => {}
        }
        index += 1;
    }

    deepest
}

fn object_stream_depth(header: &[u8], body: &[u8]) -> usize {
    let filter = ["FlateDecode", "LZWDecode"]
        .into_iter()
        .find(|name| find(header, name.as_bytes()).is_some());

    match filter {
        Some(name) => {
            let stream = Stream::new(dictionary! { "Filter" => name }, body.to_vec());
            match stream.decompressed_content() {
                Ok(content) => scan_depth(&content, false),
                Err(_) => usize::MAX,
            }
        }
        None if find(header, b"/Filter").is_some() => usize::MAX,
        None => scan_depth(body, false),
    }
}

fn stream_header(bytes: &[u8], stream_at: usize) -> &[u8] {
    let before = &bytes[..stream_at];
    let start = before
        .windows(3)
        .rposition(|window| window == b"obj")
        .unwrap_or(0);
    &before[start..]
}

fn stream_body_start(bytes: &[u8], after_keyword: usize) -> usize {
    match bytes.get(after_keyword..after_keyword + 2) {
        Some(b"\r\n") => after_keyword + 2,
        _ if bytes.get(after_keyword) == Some(&b'\n') => after_keyword + 1,
        _ => after_keyword.min(bytes.len()),
    }
}

fn skip_literal_string(bytes: &[u8], start: usize) -> (usize, usize) {
    let mut depth = 0usize;
    let mut deepest = 0usize;
    let mut index = start;

    while index < bytes.len() {
        match bytes[index] {
            b'\\' => index += 1,
            b'(' => {
                depth += 1;
                deepest = deepest.max(depth);
            }
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return (index + 1, deepest);
                }
            }
            _ => {}
        }
        index += 1;
    }

    (bytes.len(), deepest)
}

fn skip_line(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|byte| *byte == b'\n' || *byte == b'\r')
        .map_or(bytes.len(), |offset| start + offset + 1)
}

fn starts_keyword(bytes: &[u8], index: usize, keyword: &[u8]) -> bool {
    let preceded_by_word = index > 0 && bytes[index - 1].is_ascii_alphanumeric();
    let followed_by_word = bytes
        .get(index + keyword.len())
        .is_some_and(|byte| byte.is_ascii_alphanumeric());
    !preceded_by_word && !followed_by_word && bytes[index..].starts_with(keyword)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

pub fn decode_text_bounded(bytes: &[u8], max_bytes: usize) -> String {
    let bounded = &bytes[..bytes.len().min(max_bytes)];
    String::from_utf8_lossy(bounded)
        .chars()
        .filter(|ch| *ch != char::REPLACEMENT_CHARACTER && *ch != '\0')
        .collect()
}

pub fn extract_pdf_text_or_fallback<P>(extractor: &P, bytes: &[u8], fallback_bytes: usize) -> String
where
    P: PdfTextExtractor + ?Sized,
{
    match extractor.extract_text(bytes) {
        Ok(text) => text,
        Err(error) => {
            debug!(error = %error, "pdf extraction failed, decoding leading bytes");
            decode_text_bounded(bytes, fallback_bytes)
        }
    }
}
