use scraper::{ElementRef, Html, Node, Selector};
use std::sync::LazyLock;

static BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").unwrap());

/// Default size of the pieces long content is split into
pub const DEFAULT_CHUNK_CHARS: usize = 6000;

/// Collapse all runs of whitespace into single spaces and trim the ends
///
/// Used on text pulled out of PDFs, which tends to come with hard line
/// wraps and column padding.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split text into pieces of at most `max_chars` characters
///
/// Splits on character boundaries, so multi-byte text is never cut
/// mid-character. A zero limit yields the whole text as one piece.
pub fn split_content(text: &str, max_chars: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    if max_chars == 0 {
        return vec![text.to_string()];
    }

    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_chars)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Readable text of a page's body, one trimmed line per text block
///
/// `script` and `style` contents are dropped, as are blank lines.
pub fn body_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let root = doc
        .select(&BODY)
        .next()
        .unwrap_or_else(|| doc.root_element());

    let mut raw = String::new();
    collect_text(root, &mut raw);

    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn collect_text(element: ElementRef, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(text);
                out.push('\n');
            }
            Node::Element(el) if matches!(el.name(), "script" | "style") => {}
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    collect_text(child, out);
                }
            }
            _ => {}
        }
    }
}
