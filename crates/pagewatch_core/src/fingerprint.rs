use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of a page's canonical text.
///
/// Stable across process restarts, so it is persisted as-is and compared
/// directly against freshly computed values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn fingerprint(text: &str) -> Fingerprint {
    Fingerprint(hex::encode(Sha256::digest(text.as_bytes())))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::fingerprint;

    #[test]
    fn equal_text_gives_equal_fingerprint() {
        assert_eq!(fingerprint("Post A"), fingerprint("Post A"));
        assert_eq!(fingerprint(""), fingerprint(""));
    }

    #[test]
    fn fingerprint_is_fixed_width_hex() {
        let fp = fingerprint("hello");
        assert_eq!(fp.as_str().len(), 64);
        assert_eq!(
            fp.as_str(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn distinct_texts_give_distinct_fingerprints() {
        let samples = [
            "",
            " ",
            "Post A",
            "Post A ",
            "post a",
            "Post A\nPost B",
            "Post B\nPost A",
            "SSC Result 2026 declared",
            "Admit card out",
        ];
        let unique: HashSet<_> = samples.iter().map(|text| fingerprint(text)).collect();
        assert_eq!(unique.len(), samples.len());
    }
}
