//! Key layout in the bucket.
//!
//! ```text
//! games.json                                  catalog (configurable)
//! games/{game_id}/sessions.json               session list
//! games/{game_id}/save_hash.json              save folder fingerprint
//! games/{game_id}/thumbnail/{sha256}{ext}     cover image
//! games/{sanitized title}/save_data/...       save folder contents
//! games/{sanitized title}/memo/...            memo documents
//! ```

use crate::hash::sha256_hex;

/// Default key of the game catalog document.
pub const DEFAULT_METADATA_KEY: &str = "games.json";

const SESSIONS_FILE_NAME: &str = "sessions.json";
const SAVE_HASH_FILE_NAME: &str = "save_hash.json";

pub fn sessions_key(game_id: &str) -> String {
    format!("games/{game_id}/{SESSIONS_FILE_NAME}")
}

pub fn save_hash_key(game_id: &str) -> String {
    format!("games/{game_id}/{SAVE_HASH_FILE_NAME}")
}

/// Prefix holding a game's save folder, addressed by title.
pub fn save_data_prefix(title: &str) -> String {
    format!("games/{}/save_data", sanitize_title(title))
}

/// Replaces characters that are invalid in Windows file names with `_`.
///
/// Unlike the memo sanitizer this keeps spaces and does not collapse runs.
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            other => other,
        })
        .collect()
}

/// Content-addressed thumbnail key.
pub fn thumbnail_key(game_id: &str, payload: &[u8], ext: &str, content_type: &str) -> String {
    format!(
        "games/{game_id}/thumbnail/{}{}",
        sha256_hex(payload),
        normalize_image_ext(ext, content_type)
    )
}

/// Lowercases `ext` and ensures a leading dot. With no extension, guesses
/// from the content type and falls back to `.png`.
pub fn normalize_image_ext(ext: &str, content_type: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if !ext.is_empty() {
        return if ext.starts_with('.') {
            ext
        } else {
            format!(".{ext}")
        };
    }

    let guessed = if content_type.contains("png") {
        ".png"
    } else if content_type.contains("gif") {
        ".gif"
    } else if content_type.contains("jpeg") || content_type.contains("jpg") {
        ".jpg"
    } else {
        ".png"
    };
    guessed.to_string()
}
