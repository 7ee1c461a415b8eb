//! Prompt instructions that coerce a model into a declared JSON shape.
//!
//! Not every vendor offers native schema enforcement, so structured output
//! is requested the same way everywhere: a literal template plus explicit
//! prohibitions appended to the system prompt.

use serde_json::{Map, Value};

use crate::types::ResponseFormat;

/// Placeholder value shown in the template for a declared property type.
fn placeholder_for(schema: &Value) -> &'static str {
    match schema.get("type").and_then(Value::as_str) {
        Some("string") => "\"value\"",
        Some("number") | Some("integer") => "0",
        Some("boolean") => "true",
        Some("array") => "[]",
        Some("object") => "{}",
        _ => "null",
    }
}

fn properties_of(schema: &Value) -> Option<&Map<String, Value>> {
    schema.get("properties").and_then(Value::as_object)
}

fn required_of(schema: &Value) -> Vec<&str> {
    schema
        .get("required")
        .and_then(Value::as_array)
        .map(|r| r.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

/// Literal JSON template, e.g. `{"score": 0, "reason": "value"}`.
pub fn json_template(schema: &Value) -> String {
    let Some(properties) = properties_of(schema) else {
        return "{}".to_string();
    };
    let fields: Vec<String> = properties
        .iter()
        .map(|(name, prop)| {
            let key = Value::String(name.clone()).to_string();
            format!("{}: {}", key, placeholder_for(prop))
        })
        .collect();
    format!("{{{}}}", fields.join(", "))
}

/// Build the full instruction block for a requested response format.
pub fn structured_output_instructions(format: &ResponseFormat) -> String {
    let schema = &format.schema;
    let required = required_of(schema);

    let mut out = String::new();
    out.push_str("Do not add any text before or after the JSON object.\n\n");
    out.push_str("Please respond with a JSON object in exactly this format:\n");
    out.push_str(&json_template(schema));
    out.push('\n');

    if let Some(properties) = properties_of(schema) {
        if !properties.is_empty() {
            out.push_str("\nField descriptions:\n");
            for (name, prop) in properties {
                let ty = prop.get("type").and_then(Value::as_str).unwrap_or("any");
                let requirement = if required.contains(&name.as_str()) {
                    "required"
                } else {
                    "optional"
                };
                out.push_str(&format!("- {} ({}, {})", name, ty, requirement));
                if let Some(desc) = prop.get("description").and_then(Value::as_str) {
                    out.push_str(&format!(": {}", desc));
                }
                out.push('\n');
            }
        }
    }

    out.push_str("\nImportant:\n");
    out.push_str("- Respond ONLY with the JSON object, no extra text or explanations\n");
    out.push_str("- Do NOT wrap the object in an array\n");
    out.push_str("- Do NOT include any fields that are not listed above\n");
    out.push_str("- The response MUST be valid JSON");
    out
}

/// Append the instruction block to an optional system prompt.
pub fn with_structured_output(system_prompt: Option<&str>, format: &ResponseFormat) -> String {
    let instructions = structured_output_instructions(format);
    match system_prompt.map(str::trim).filter(|s| !s.is_empty()) {
        Some(prompt) => format!("{}\n\n{}", prompt, instructions),
        None => instructions,
    }
}
