use chardetng::EncodingDetector;
use encoding_rs::Encoding;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    pub encoding_label: String,
}

/// Decodes a response body to UTF-8.
///
/// Order of precedence: byte order mark, then the `charset` parameter of the
/// Content-Type header, then `chardetng` detection. Malformed sequences are
/// replaced rather than rejected; a page with a few bad bytes still has a
/// monitored block worth comparing.
pub fn decode_text(bytes: &[u8], content_type: Option<&str>) -> DecodedText {
    let encoding = Encoding::for_bom(bytes)
        .map(|(encoding, _)| encoding)
        .or_else(|| {
            content_type
                .and_then(charset_param)
                .and_then(|label| Encoding::for_label(label.as_bytes()))
        })
        .unwrap_or_else(|| {
            let mut detector = EncodingDetector::new();
            detector.feed(bytes, true);
            detector.guess(None, true)
        });

    // `decode` strips a matching BOM itself.
    let (text, used, _had_errors) = encoding.decode(bytes);
    DecodedText {
        text: text.into_owned(),
        encoding_label: used.name().to_string(),
    }
}

fn charset_param(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|part| {
        let (key, value) = part.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches(&['"', '\''][..]).to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::{charset_param, decode_text};

    #[test]
    fn charset_param_is_case_insensitive_and_unquoted() {
        assert_eq!(
            charset_param("text/html; Charset=\"ISO-8859-1\""),
            Some("ISO-8859-1".to_string())
        );
        assert_eq!(charset_param("text/html"), None);
    }

    #[test]
    fn header_charset_is_honoured() {
        let decoded = decode_text(b"caf\xe9", Some("text/html; charset=ISO-8859-1"));
        assert_eq!(decoded.text, "café");
    }

    #[test]
    fn bom_wins_over_header() {
        let decoded = decode_text(b"\xEF\xBB\xBFhello", Some("text/html; charset=ISO-8859-1"));
        assert_eq!(decoded.text, "hello");
        assert_eq!(decoded.encoding_label, "UTF-8");
    }

    #[test]
    fn plain_utf8_is_detected_without_header() {
        let decoded = decode_text("Résultat ✓".as_bytes(), None);
        assert_eq!(decoded.text, "Résultat ✓");
    }
}
