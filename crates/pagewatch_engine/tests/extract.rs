use pagewatch_engine::{BlockExtractor, Extractor};
use pretty_assertions::assert_eq;

#[test]
fn extracts_trimmed_text_of_first_post_block() {
    let html = r#"
    <html><body>
        <div class="nav">Menu</div>
        <div class="post">
            <h2>SSC Result 2026</h2>
        </div>
        <div class="post">Older post</div>
    </body></html>
    "#;
    let text = BlockExtractor::default().extract(html);
    assert_eq!(text.as_deref(), Some("SSC Result 2026"));
}

#[test]
fn nested_text_is_concatenated() {
    let html = r#"<div class="post">Admit <b>Card</b> out<br>now</div>"#;
    let text = BlockExtractor::default().extract(html);
    assert_eq!(text.as_deref(), Some("Admit Card outnow"));
}

#[test]
fn missing_block_is_none() {
    let html = "<html><body><div class=\"article\">x</div></body></html>";
    assert_eq!(BlockExtractor::default().extract(html), None);
}

#[test]
fn blank_block_is_empty_text_not_absent() {
    let html = "<div class=\"post\">   \n  </div>";
    assert_eq!(BlockExtractor::default().extract(html).as_deref(), Some(""));
}

#[test]
fn malformed_html_does_not_panic() {
    let extractor = BlockExtractor::default();
    assert_eq!(
        extractor.extract("<div class=\"post\"><p>unterminated <b>bold").as_deref(),
        Some("unterminated bold")
    );
    assert_eq!(extractor.extract("<<<>>>&&&"), None);
    assert_eq!(extractor.extract(""), None);
}
