use crate::engine::runtime::{Error, ErrorCode};
use core::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

pub trait Collation: Send + Sync {
    fn uri(&self) -> &str;
    fn compare(&self, a: &str, b: &str) -> Ordering;
    fn key(&self, s: &str) -> String {
        s.to_string()
    }
}

pub use crate::consts::CODEPOINT_URI;
pub use crate::consts::SIMPLE_ACCENT_URI;
pub use crate::consts::SIMPLE_CASE_ACCENT_URI;
pub use crate::consts::SIMPLE_CASE_URI;

pub struct CodepointCollation;

impl Collation for CodepointCollation {
    fn uri(&self) -> &str {
        CODEPOINT_URI
    }
    fn compare(&self, a: &str, b: &str) -> Ordering {
        a.cmp(b)
    }
}

/// Case-insensitive collation
pub struct SimpleCaseCollation;

impl Collation for SimpleCaseCollation {
    fn uri(&self) -> &str {
        SIMPLE_CASE_URI
    }
    fn compare(&self, a: &str, b: &str) -> Ordering {
        self.key(a).cmp(&self.key(b))
    }
    fn key(&self, s: &str) -> String {
        s.to_lowercase()
    }
}

fn strip_marks(s: &str) -> String {
    use unicode_normalization::UnicodeNormalization;
    use unicode_normalization::char::canonical_combining_class as ccc;
    s.nfd().filter(|&ch| ccc(ch) == 0).collect()
}

/// Accent-insensitive collation (NFD, combining marks removed)
pub struct SimpleAccentCollation;

impl Collation for SimpleAccentCollation {
    fn uri(&self) -> &str {
        SIMPLE_ACCENT_URI
    }
    fn compare(&self, a: &str, b: &str) -> Ordering {
        self.key(a).cmp(&self.key(b))
    }
    fn key(&self, s: &str) -> String {
        strip_marks(s)
    }
}

pub struct SimpleCaseAccentCollation;

impl Collation for SimpleCaseAccentCollation {
    fn uri(&self) -> &str {
        SIMPLE_CASE_ACCENT_URI
    }
    fn compare(&self, a: &str, b: &str) -> Ordering {
        self.key(a).cmp(&self.key(b))
    }
    fn key(&self, s: &str) -> String {
        strip_marks(s).to_lowercase()
    }
}

/// Collations by URI, plus language-tag aliases used by sort keys.
///
/// A well-formed language tag with no alias resolves to the language
/// default (simple-case unless changed).
pub struct CollationRegistry {
    by_uri: HashMap<String, Arc<dyn Collation>>,
    by_lang: HashMap<String, String>,
    lang_default: Option<String>,
}

impl Default for CollationRegistry {
    fn default() -> Self {
        let mut reg = Self {
            by_uri: HashMap::new(),
            by_lang: HashMap::new(),
            lang_default: Some(SIMPLE_CASE_URI.to_string()),
        };
        reg.insert(Arc::new(CodepointCollation));
        reg.insert(Arc::new(SimpleCaseCollation));
        reg.insert(Arc::new(SimpleAccentCollation));
        reg.insert(Arc::new(SimpleCaseAccentCollation));
        reg
    }
}

impl CollationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, uri: &str) -> Option<Arc<dyn Collation>> {
        self.by_uri.get(uri).cloned()
    }

    pub fn insert(&mut self, collation: Arc<dyn Collation>) {
        self.by_uri.insert(collation.uri().to_string(), collation);
    }

    /// Use the collation registered under `uri` for the language `lang`
    /// (matched case-insensitively, with `-` subtags falling back to the
    /// primary tag).
    pub fn alias_language(&mut self, lang: &str, uri: &str) {
        self.by_lang.insert(lang.to_ascii_lowercase(), uri.to_string());
    }

    /// Collation for language tags without an alias; `None` makes such tags
    /// an error.
    pub fn set_language_default(&mut self, uri: Option<&str>) {
        self.lang_default = uri.map(str::to_string);
    }

    /// Resolve a collation URI or language tag; `None` selects codepoint order.
    pub fn resolve(&self, name: Option<&str>) -> Result<Arc<dyn Collation>, Error> {
        let Some(name) = name else {
            return Ok(self.codepoint());
        };
        if let Some(c) = self.get(name) {
            return Ok(c);
        }
        let mut tag = name.to_ascii_lowercase();
        loop {
            if let Some(c) = self.by_lang.get(&tag).and_then(|uri| self.get(uri)) {
                return Ok(c);
            }
            match tag.rfind('-') {
                Some(cut) => tag.truncate(cut),
                None => break,
            }
        }
        if is_language_tag(name)
            && let Some(c) = self.lang_default.as_deref().and_then(|uri| self.get(uri))
        {
            return Ok(c);
        }
        Err(Error::from_code(
            ErrorCode::FOCH0002,
            format!("unknown collation or language: {name}"),
        ))
    }

    fn codepoint(&self) -> Arc<dyn Collation> {
        self.get(CODEPOINT_URI)
            .unwrap_or_else(|| Arc::new(CodepointCollation))
    }
}

/// `primary(-subtag)*`: a 2-8 letter primary subtag (or `i`/`x`) followed by
/// 1-8 character alphanumeric subtags.
fn is_language_tag(s: &str) -> bool {
    let mut parts = s.split('-');
    let primary_ok = parts.next().is_some_and(|p| {
        p.bytes().all(|b| b.is_ascii_alphabetic())
            && ((2..=8).contains(&p.len()) || p.eq_ignore_ascii_case("i") || p.eq_ignore_ascii_case("x"))
    });
    primary_ok && parts.all(|p| (1..=8).contains(&p.len()) && p.bytes().all(|b| b.is_ascii_alphanumeric()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_language_aliases() {
        let mut reg = CollationRegistry::default();
        reg.alias_language("de", SIMPLE_CASE_URI);
        assert_eq!(reg.resolve(Some("de-AT")).unwrap().uri(), SIMPLE_CASE_URI);
        assert_eq!(reg.resolve(None).unwrap().uri(), CODEPOINT_URI);
        assert_eq!(reg.resolve(Some("fr")).unwrap().uri(), SIMPLE_CASE_URI);
        let err = reg.resolve(Some("urn:no-such-collation")).err().unwrap();
        assert_eq!(err.code, ErrorCode::FOCH0002);

        reg.set_language_default(None);
        assert!(reg.resolve(Some("fr")).is_err());
        assert_eq!(reg.resolve(Some("de-CH")).unwrap().uri(), SIMPLE_CASE_URI);
    }

    #[test]
    fn language_tag_shape() {
        for ok in ["en", "en-US", "zh-Hant-TW", "x-klingon", "de-1996"] {
            assert!(is_language_tag(ok), "{ok}");
        }
        for bad in ["", "e", "en-", "en_US", "urn:x", "toolongprimary", "en-abcdefghi"] {
            assert!(!is_language_tag(bad), "{bad}");
        }
    }

    #[test]
    fn accent_insensitive_key() {
        let c = SimpleCaseAccentCollation;
        assert_eq!(c.compare("Éte", "ete"), Ordering::Equal);
    }
}
