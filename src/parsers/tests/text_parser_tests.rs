use crate::parsers::text::{self, DEFAULT_CHUNK_CHARS};

#[cfg(test)]
mod clean_text_tests {
    use super::*;

    #[test]
    fn test_empty_text() {
        assert_eq!(text::clean_text(""), "");
    }

    #[test]
    fn test_whitespace_only() {
        assert_eq!(text::clean_text("   \n   \t   \r\n   "), "");
    }

    #[test]
    fn test_wrapped_lines_are_joined() {
        let input = "Deep learning for\nprotein folding\n\n  Abstract  ";
        assert_eq!(
            text::clean_text(input),
            "Deep learning for protein folding Abstract"
        );
    }

    #[test]
    fn test_multiple_spaces_between_words() {
        let input = "Hello    world!    This    is    a    test.";
        assert_eq!(text::clean_text(input), "Hello world! This is a test.");
    }

    #[test]
    fn test_urls_kept_intact() {
        let input = "See https://example.com/a.pdf\nfor details";
        assert_eq!(
            text::clean_text(input),
            "See https://example.com/a.pdf for details"
        );
    }
}

#[cfg(test)]
mod split_content_tests {
    use super::*;

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = text::split_content("short", DEFAULT_CHUNK_CHARS);
        assert_eq!(chunks, vec!["short".to_string()]);
    }

    #[test]
    fn test_empty_text_no_chunks() {
        assert!(text::split_content("", 10).is_empty());
    }

    #[test]
    fn test_exact_chunk_sizes() {
        let input = "a".repeat(25);
        let chunks = text::split_content(&input, 10);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 10);
        assert_eq!(chunks[1].len(), 10);
        assert_eq!(chunks[2].len(), 5);
        assert_eq!(chunks.concat(), input);
    }

    #[test]
    fn test_multibyte_boundaries() {
        let input = "ééééé";
        let chunks = text::split_content(input, 2);
        assert_eq!(chunks, vec!["éé", "éé", "é"]);
    }

    #[test]
    fn test_zero_limit_keeps_text_whole() {
        assert_eq!(text::split_content("abc", 0), vec!["abc".to_string()]);
    }
}

#[cfg(test)]
mod body_text_tests {
    use super::*;

    const CALL_FOR_PAPERS: &str = r#"
<html>
  <head>
    <title>Workshop 2024</title>
    <style>body { color: red; }</style>
  </head>
  <body>
    <h1>  Call for papers  </h1>
    <script>var tracking = "hidden";</script>
    <p>Submissions due <b>May 1</b>.</p>
    <style>.banner { display: none; }</style>


    <ul><li>Track A</li><li>Track B</li></ul>
  </body>
</html>
"#;

    #[test]
    fn test_scripts_and_styles_dropped() {
        let body = text::body_text(CALL_FOR_PAPERS);
        assert!(!body.contains("tracking"));
        assert!(!body.contains("display"));
        assert!(!body.contains("color"));
    }

    #[test]
    fn test_one_trimmed_line_per_text_block() {
        assert_eq!(
            text::body_text(CALL_FOR_PAPERS),
            "Call for papers\nSubmissions due\nMay 1\n.\nTrack A\nTrack B"
        );
    }

    #[test]
    fn test_head_is_not_body() {
        assert!(!text::body_text(CALL_FOR_PAPERS).contains("Workshop 2024"));
    }

    #[test]
    fn test_empty_page() {
        assert_eq!(text::body_text(""), "");
        assert_eq!(text::body_text("<html><body>   </body></html>"), "");
    }
}
