//! Memo cloud key construction and parsing.

use regex::Regex;
use std::sync::LazyLock;

/// Longest sanitized segment, in characters.
pub const MAX_SEGMENT_CHARS: usize = 100;

static MEMO_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^games/([^/]+)/memo/(.+)_([^_]+)\.md$").expect("memo path pattern is valid")
});

/// Parts recovered from a memo key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemoPathInfo {
    pub game_title: String,
    pub memo_title: String,
    pub memo_id: String,
}

/// Makes a string safe to use as a single key segment.
///
/// Spaces and `< > : " / \ | ? *` become `_`, runs of `_` collapse to one,
/// leading/trailing `_` are dropped and the result is capped at
/// [`MAX_SEGMENT_CHARS`] characters.
pub fn sanitize_for_cloud_path(name: &str) -> String {
    let mut sanitized = String::with_capacity(name.len());
    for c in name.chars() {
        let mapped = match c {
            ' ' | '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            other => other,
        };
        if mapped == '_' && sanitized.ends_with('_') {
            continue;
        }
        sanitized.push(mapped);
    }

    sanitized
        .trim_matches('_')
        .chars()
        .take(MAX_SEGMENT_CHARS)
        .collect()
}

/// `games/{game}/memo/{title}_{id}.md`
pub fn build_memo_path(game_title: &str, memo_title: &str, memo_id: &str) -> String {
    format!(
        "games/{}/memo/{}_{memo_id}.md",
        sanitize_for_cloud_path(game_title),
        sanitize_for_cloud_path(memo_title)
    )
}

/// Prefix covering one game's memos, or every game when the title is blank.
pub fn build_memo_prefix(game_title: &str) -> String {
    if game_title.trim().is_empty() {
        return "games/".to_string();
    }
    format!("games/{}/memo/", sanitize_for_cloud_path(game_title))
}

pub fn is_memo_path(path: &str) -> bool {
    path.contains("/memo/") && path.ends_with(".md")
}

/// Splits a memo key into game title, memo title and memo id.
pub fn extract_memo_info(path: &str) -> Option<MemoPathInfo> {
    let caps = MEMO_PATH.captures(path)?;
    Some(MemoPathInfo {
        game_title: caps[1].to_string(),
        memo_title: caps[2].to_string(),
        memo_id: caps[3].to_string(),
    })
}
