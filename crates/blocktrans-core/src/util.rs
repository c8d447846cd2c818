//! Utility functions shared across the crate.

use chrono::{Local, NaiveTime};
use std::path::PathBuf;

/// Get the user's config directory following XDG conventions.
///
/// Returns `$XDG_CONFIG_HOME` if set, otherwise `$HOME/.config`.
pub fn config_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
}

/// Strip the last extension from a file name (`report.v2.pdf` -> `report.v2`).
///
/// Any directory components are dropped first. Names without a dot are
/// returned whole.
pub fn base_name(original: &str) -> &str {
    let file = original.rsplit(['/', '\\']).next().unwrap_or(original);
    match file.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file,
    }
}

/// Output file name for a translation generated at `time`:
/// `<base>_translated_<HHMMSS>.pdf`.
pub fn output_filename_at(original: &str, time: NaiveTime) -> String {
    let base = base_name(original);
    let base = if base.is_empty() { "document" } else { base };
    format!("{base}_translated_{}.pdf", time.format("%H%M%S"))
}

/// Output file name stamped with the current local wall-clock time.
pub fn output_filename(original: &str) -> String {
    output_filename_at(original, Local::now().time())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn is_generated_name(name: &str, base: &str) -> bool {
        let Some(rest) = name.strip_prefix(&format!("{base}_translated_")) else {
            return false;
        };
        let Some(digits) = rest.strip_suffix(".pdf") else {
            return false;
        };
        digits.len() == 6 && digits.chars().all(|c| c.is_ascii_digit())
    }

    #[test]
    fn test_output_filename_zero_padded() {
        let time = NaiveTime::from_hms_opt(7, 5, 3).unwrap();
        assert_eq!(output_filename_at("paper.pdf", time), "paper_translated_070503.pdf");
    }

    #[test]
    fn test_output_filename_24_hour() {
        let time = NaiveTime::from_hms_opt(23, 59, 0).unwrap();
        assert_eq!(output_filename_at("paper.pdf", time), "paper_translated_235900.pdf");
    }

    #[test]
    fn test_output_filename_now_matches_pattern() {
        let name = output_filename("annual report.pdf");
        assert!(is_generated_name(&name, "annual report"), "unexpected name {name}");
    }

    #[test]
    fn test_base_name_variants() {
        assert_eq!(base_name("paper.pdf"), "paper");
        assert_eq!(base_name("paper.v2.pdf"), "paper.v2");
        assert_eq!(base_name("README"), "README");
        assert_eq!(base_name("/tmp/in/paper.pdf"), "paper");
        assert_eq!(base_name(".hidden"), ".hidden");
    }

    #[test]
    fn test_output_filename_empty_name() {
        let time = NaiveTime::from_hms_opt(1, 2, 3).unwrap();
        assert_eq!(output_filename_at("", time), "document_translated_010203.pdf");
    }
}
