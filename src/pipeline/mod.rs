//! The extraction pipeline, stage by stage:
//!
//! 1. [`input`]  — resolve a path or URL to image bytes, sniff the format
//! 2. [`encode`] — bytes → base64 `ImageData` payload
//! 3. [`llm`]    — one vision chat-completion call, no retry
//! 4. [`parse`]  — model text → [`crate::table::TableData`]

pub mod encode;
pub mod input;
pub mod llm;
pub mod parse;
