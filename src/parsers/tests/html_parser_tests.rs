use crate::parsers::RawImage;
use crate::parsers::html::{parse_anchors, parse_content, parse_download_links};
use crate::results::{CandidateLink, Heading};

const PAPERS_PAGE: &str = r#"
<html>
  <head><title> Workshop  Proceedings </title></head>
  <body>
    <h1>Accepted papers</h1>
    <p>Welcome to the   proceedings.</p>
    <p>   </p>
    <h2>Session <em>A</em></h2>
    <p>Talks in the morning.</p>
    <img src="/img/logo.png" alt="Logo">
    <img src="">
    <img src="https://cdn.example.org/banner.jpg">
    <a href="/files/a.pdf">Paper A</a>
    <a href="papers/b.PDF">Paper B</a>
    <a href="/files/a.pdf">Paper A again</a>
    <a href="download_file.php?id=7">Download</a>
    <a href="/about">About</a>
    <a href="">Empty</a>
    <a>No href</a>
  </body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_anchors() {
        let anchors = parse_anchors(PAPERS_PAGE);
        assert_eq!(anchors.len(), 5);
        assert_eq!(
            anchors[0],
            ("/files/a.pdf".to_string(), "Paper A".to_string())
        );
    }

    #[test]
    fn test_download_links_resolved_and_deduplicated() {
        let links = parse_download_links(PAPERS_PAGE, "http://site.org/conf/index.html");
        assert_eq!(
            links,
            vec![
                "http://site.org/files/a.pdf".to_string(),
                "http://site.org/conf/papers/b.PDF".to_string(),
                "http://site.org/conf/download_file.php?id=7".to_string(),
            ]
        );
    }

    #[test]
    fn test_no_links() {
        let links = parse_download_links("<html><body><p>nothing</p></body></html>", "http://site.org/");
        assert!(links.is_empty());
    }

    #[test]
    fn test_parse_content() {
        let content = parse_content(PAPERS_PAGE, "http://site.org/conf/index.html");

        assert_eq!(content.title, "Workshop Proceedings");
        assert_eq!(
            content.headings,
            vec![
                Heading {
                    level: 1,
                    text: "Accepted papers".to_string()
                },
                Heading {
                    level: 2,
                    text: "Session A".to_string()
                },
            ]
        );
        assert_eq!(
            content.paragraphs,
            vec![
                "Welcome to the proceedings.".to_string(),
                "Talks in the morning.".to_string()
            ]
        );
        assert_eq!(
            content.images,
            vec![
                RawImage {
                    src: "/img/logo.png".to_string(),
                    alt: "Logo".to_string()
                },
                RawImage {
                    src: "https://cdn.example.org/banner.jpg".to_string(),
                    alt: String::new()
                },
            ]
        );
        assert_eq!(content.links.len(), 5);
        assert_eq!(
            content.links[4],
            CandidateLink {
                url: "http://site.org/about".to_string(),
                text: "About".to_string()
            }
        );
        assert!(content.links.iter().all(|l| l.url.starts_with("http://")));
    }

    #[test]
    fn test_missing_structure_degrades_to_empty() {
        let content = parse_content("<div>just text</div>", "http://site.org/");
        assert_eq!(content.title, "");
        assert!(content.headings.is_empty());
        assert!(content.paragraphs.is_empty());
        assert!(content.images.is_empty());
        assert!(content.links.is_empty());
    }
}
