//! Filename validation, cleaning, and conflict-safe uniquification (spec §4.E).

use std::sync::Arc;

use unicode_normalization::UnicodeNormalization;

use crate::api::list::{list_page, ListQuery};
use crate::config::EncodingPolicy;
use crate::constant::{
    FALLBACK_FILENAME, LIST_LAST_PAGE_MARKER, MAX_FILENAME_BYTES, MAX_FILENAME_CODEPOINTS,
    UNIQUIFY_MAX_SUFFIX,
};
use crate::error::{Pan123Error, Result};
use crate::gateway::Gateway;

/// Apply the configured encoding policy before `validate`/`clean` ever see
/// the name (spec §6 "filename-encoding policy applied at the boundary").
/// Clients on case-insensitive, NFD-producing filesystems (macOS) hand over
/// decomposed filenames the provider would otherwise treat as distinct from
/// their NFC-composed counterparts.
pub fn apply_encoding(name: &str, policy: EncodingPolicy) -> String {
    match policy {
        EncodingPolicy::Passthrough => name.to_string(),
        EncodingPolicy::NormalizeNfc => name.nfc().collect(),
    }
}

fn is_forbidden(c: char) -> bool {
    matches!(c, '"' | '\\' | '/' | ':' | '*' | '?' | '|' | '>' | '<')
}

/// Returns `Err` describing why `name` is unacceptable as-is; never mutates.
pub fn validate(name: &str) -> Result<()> {
    if name.contains('/') || name.contains('\\') {
        return Err(Pan123Error::InvalidInput(
            "filename contains a path separator".into(),
        ));
    }
    if name.trim().is_empty() {
        return Err(Pan123Error::InvalidInput("filename is blank".into()));
    }
    if name.chars().count() > MAX_FILENAME_CODEPOINTS {
        return Err(Pan123Error::InvalidInput(format!(
            "filename exceeds {MAX_FILENAME_CODEPOINTS} code points"
        )));
    }
    if name.len() > MAX_FILENAME_BYTES {
        return Err(Pan123Error::InvalidInput(format!(
            "filename exceeds {MAX_FILENAME_BYTES} UTF-8 bytes"
        )));
    }
    if name.chars().any(is_forbidden) {
        return Err(Pan123Error::InvalidInput(
            "filename contains a forbidden character".into(),
        ));
    }
    Ok(())
}

/// Split `name` into (stem, extension-including-dot), where the extension is
/// the last `.suffix` if one exists and isn't the whole name.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 && idx < name.len() - 1 => name.split_at(idx),
        _ => (name, ""),
    }
}

fn truncate_to_budget(stem: &str, ext: &str) -> String {
    let budget_bytes = MAX_FILENAME_BYTES.saturating_sub(ext.len());
    let mut truncated = String::new();
    let mut bytes_used = 0usize;
    let mut count = 0usize;
    for c in stem.chars() {
        if count >= MAX_FILENAME_CODEPOINTS {
            break;
        }
        let clen = c.len_utf8();
        if bytes_used + clen > budget_bytes {
            break;
        }
        truncated.push(c);
        bytes_used += clen;
        count += 1;
    }
    format!("{truncated}{ext}")
}

/// Replace forbidden characters with `_`, truncate to the byte/code-point
/// budget while keeping the extension, and fall back to the literal
/// placeholder name when nothing usable remains.
pub fn clean(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    let trimmed = replaced.trim();
    if trimmed.is_empty() {
        return FALLBACK_FILENAME.to_string();
    }

    let (stem, ext) = split_extension(trimmed);
    let fits = trimmed.chars().count() <= MAX_FILENAME_CODEPOINTS
        && trimmed.len() <= MAX_FILENAME_BYTES;
    if fits {
        trimmed.to_string()
    } else {
        let truncated = truncate_to_budget(stem, ext);
        if truncated.trim().is_empty() {
            FALLBACK_FILENAME.to_string()
        } else {
            truncated
        }
    }
}

/// Probe `base`, `base (1).ext`, … `base (999).ext` against the parent's
/// current listing; append a UNIX timestamp if every candidate is taken.
pub async fn uniquify(gateway: &Arc<Gateway>, parent_id: i64, base: &str) -> Result<String> {
    let existing = list_all_names(gateway, parent_id).await?;
    if !existing.contains(base) {
        return Ok(base.to_string());
    }

    let (stem, ext) = split_extension(base);
    for suffix in 1..=UNIQUIFY_MAX_SUFFIX {
        let candidate = format!("{stem} ({suffix}){ext}");
        if !existing.contains(&candidate) {
            return Ok(candidate);
        }
    }

    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    Ok(format!("{stem}_{now}{ext}"))
}

async fn list_all_names(gateway: &Arc<Gateway>, parent_id: i64) -> Result<std::collections::HashSet<String>> {
    let mut names = std::collections::HashSet::new();
    let mut query = ListQuery::first_page(parent_id);
    loop {
        let page = list_page(gateway, &query).await?;
        for entry in &page.file_list {
            if !entry.is_trashed() {
                names.insert(entry.filename.clone());
            }
        }
        if page.last_file_id == LIST_LAST_PAGE_MARKER {
            break;
        }
        query = ListQuery::next_page(parent_id, page.last_file_id);
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_separators_and_blank() {
        assert!(validate("a/b").is_err());
        assert!(validate("a\\b").is_err());
        assert!(validate("   ").is_err());
        assert!(validate("ok.txt").is_ok());
    }

    #[test]
    fn validate_rejects_forbidden_characters() {
        assert!(validate("weird?name.txt").is_err());
        assert!(validate("weird*name.txt").is_err());
    }

    #[test]
    fn clean_replaces_forbidden_characters() {
        assert_eq!(clean("a?b*c.txt"), "a_b_c.txt");
    }

    #[test]
    fn clean_falls_back_on_empty_input() {
        assert_eq!(clean(""), FALLBACK_FILENAME);
        assert_eq!(clean("   "), FALLBACK_FILENAME);
        assert_eq!(clean("???"), FALLBACK_FILENAME);
    }

    #[test]
    fn clean_truncates_preserving_extension() {
        let long_stem = "a".repeat(300);
        let name = format!("{long_stem}.txt");
        let cleaned = clean(&name);
        assert!(cleaned.ends_with(".txt"));
        assert!(cleaned.len() <= MAX_FILENAME_BYTES);
    }

    #[test]
    fn passthrough_leaves_decomposed_form_untouched() {
        let decomposed = "e\u{0301}.txt"; // "é" as e + combining acute accent
        assert_eq!(apply_encoding(decomposed, EncodingPolicy::Passthrough), decomposed);
    }

    #[test]
    fn normalize_nfc_composes_decomposed_input() {
        let decomposed = "e\u{0301}.txt";
        let composed = "\u{00e9}.txt"; // "é" as a single code point
        assert_eq!(
            apply_encoding(decomposed, EncodingPolicy::NormalizeNfc),
            composed
        );
    }
}
