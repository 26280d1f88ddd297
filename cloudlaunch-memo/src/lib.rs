//! Memo documents in cloud storage.
//!
//! Memos are stored as `games/{game}/memo/{title}_{id}.md`. Both the game and
//! memo title segments pass through [`sanitize_for_cloud_path`] so that
//! [`extract_memo_info`] can split a key back into its parts.

mod cloud_path;
mod content_hash;

pub use cloud_path::{
    MAX_SEGMENT_CHARS, MemoPathInfo, build_memo_path, build_memo_prefix, extract_memo_info,
    is_memo_path, sanitize_for_cloud_path,
};
pub use content_hash::calculate_content_hash;
