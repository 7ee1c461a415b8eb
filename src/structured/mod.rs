//! Structured output support.
//!
//! - [`structured_output_instructions`]: prompt block describing the JSON shape
//! - [`extract_json_object`]: best-effort isolation of the JSON object in a reply
//!
//! # Examples
//!
//! ```
//! use ai_provider_runtime::structured::{extract_json_object, json_template};
//! use serde_json::json;
//!
//! let schema = json!({ "properties": { "score": { "type": "number" } } });
//! assert_eq!(json_template(&schema), r#"{"score": 0}"#);
//!
//! let reply = r#"Sure! {"score": 4}"#;
//! assert_eq!(extract_json_object(reply).as_deref(), Some(r#"{"score": 4}"#));
//! ```

pub mod extract;
pub mod instructions;

pub use extract::extract_json_object;
pub use instructions::{json_template, structured_output_instructions, with_structured_output};
