//! Stored-name generation for both pools.
//!
//! Pending names are opaque UUID tokens so nothing user-supplied reaches the
//! upload directory. Output names keep a readable prefix taken from the
//! original filename followed by the Unix second of production; two outputs of
//! the same source name finishing in the same second would share a name, so
//! the output pool resolves that case with [`disambiguate`] when it registers
//! the file.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Fallback stem when sanitizing leaves nothing usable
const EMPTY_STEM: &str = "file";

/// Mint an internal name for a pending upload: a random v4 UUID plus `extension`.
pub fn mint_pending_name(extension: &str) -> String {
    format!("{}{}", Uuid::new_v4(), extension)
}

/// Mint a readable output name such as `My_File_1678901234.pptx`.
pub fn mint_friendly_name(original_name: &str, new_extension: &str) -> String {
    friendly_name_at(original_name, new_extension, Utc::now())
}

pub fn friendly_name_at(original_name: &str, new_extension: &str, at: DateTime<Utc>) -> String {
    let sanitized = secure_filename(original_name);
    let (stem, _) = split_extension(&sanitized);
    let stem = if stem.is_empty() { EMPTY_STEM } else { stem };
    format!("{}_{}{}", stem, at.timestamp(), new_extension)
}

/// Append `-n` to the stem of `name`, keeping its extension.
pub fn disambiguate(name: &str, n: u32) -> String {
    let (stem, ext) = split_extension(name);
    format!("{}-{}{}", stem, n, ext)
}

/// Reduce a client-supplied filename to a flat, ASCII-only name.
///
/// Path separators become word breaks, whitespace runs collapse to `_`, every
/// character outside `[A-Za-z0-9._-]` is dropped and leading/trailing dots and
/// underscores are trimmed, so `../../etc/passwd` becomes `etc_passwd`.
pub fn secure_filename(filename: &str) -> String {
    let flattened: String = filename
        .chars()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = flattened.split_whitespace().collect::<Vec<_>>().join("_");

    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();

    kept.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Split `name` into stem and extension (with its dot). A leading dot does not
/// start an extension.
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], &name[idx..]),
        _ => (name, ""),
    }
}
