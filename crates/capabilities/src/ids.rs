//! Well-known capability identifiers.
//!
//! Identifiers are opaque strings; these constants only keep spelling
//! consistent between providers and plugins.

pub const TEXT_GENERATION: &str = "text-generation";
pub const MULTI_MODAL_TEXT_GENERATION: &str = "multi-modal-text-generation";
pub const IMAGE_GENERATION: &str = "image-generation";
pub const IMAGE_DESCRIPTION: &str = "image-description";
pub const TEXT_EMBEDDING: &str = "text-embedding";
