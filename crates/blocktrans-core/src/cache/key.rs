use crate::config::Lang;

/// Memo key for one translated block.
///
/// Keys are opaque MD5 hashes of the block text, backend and language pair:
/// - the same text sent to the same backend and pair maps to the same key
/// - any change to inputs produces a different key
/// - keys are fixed-length (32 hex chars)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    hash: String,
}

impl CacheKey {
    pub fn new(text: &str, translator: &str, source_lang: &Lang, target_lang: &Lang) -> Self {
        // Null separators keep ("a", "bc") and ("ab", "c") apart
        let combined = format!(
            "{}\0{}\0{}\0{}",
            text,
            translator.to_lowercase(),
            source_lang.as_str(),
            target_lang.as_str(),
        );

        Self {
            hash: format!("{:x}", md5::compute(combined.as_bytes())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.hash
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(text: &str, translator: &str, src: &str, tgt: &str) -> CacheKey {
        CacheKey::new(text, translator, &Lang::new(src), &Lang::new(tgt))
    }

    #[test]
    fn test_cache_key_is_fixed_length_hash() {
        let k = key("Hello world", "Google", "en", "id");
        assert_eq!(k.as_str().len(), 32);
        assert!(k.to_string().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_cache_key_differs_by_content() {
        assert_ne!(key("Hello", "Google", "en", "id"), key("World", "Google", "en", "id"));
    }

    #[test]
    fn test_cache_key_differs_by_translator() {
        assert_ne!(key("Hello", "Google", "en", "id"), key("Hello", "OpenAI", "en", "id"));
    }

    #[test]
    fn test_cache_key_differs_by_language_pair() {
        assert_ne!(key("Hello", "Google", "en", "id"), key("Hello", "Google", "en", "ms"));
        assert_ne!(key("Hello", "Google", "en", "id"), key("Hello", "Google", "auto", "id"));
    }

    #[test]
    fn test_cache_key_separator() {
        assert_ne!(key("a", "bc", "en", "id"), key("a\0b", "c", "en", "id"));
    }

    #[test]
    fn test_cache_key_case_insensitive_translator() {
        assert_eq!(key("Hello", "Google", "en", "id"), key("Hello", "GOOGLE", "en", "id"));
    }
}
