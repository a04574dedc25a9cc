//! Structured-output schemas.
//!
//! A [`SchemaDescription`] describes the shape of data a model is asked to
//! produce. The formatter turns it into plain text that can be pasted into a
//! prompt; the structured helpers build the full instruction, pull JSON back
//! out of a model reply and check it against the same description.

pub mod description;
pub mod error;
pub mod format;
pub mod json_schema;
pub mod structured;

pub use {
    description::{Field, SchemaDescription, SchemaKind},
    error::{Error, Result},
    format::{format_schema, type_name},
    structured::{extract_json, structured_output_prompt, validate},
};
