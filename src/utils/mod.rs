//! Helpers used by the response normalizer.
//!
//! - [`key_case`] - snake_case → camelCase key rewriting
//! - [`etag`] - Weak ETag computation

pub mod etag;
pub mod key_case;
