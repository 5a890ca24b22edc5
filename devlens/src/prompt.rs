//! Prompt framing for structured output.

use devlens_output::SchemaDescriptor;

const JSON_INSTRUCTIONS: &str = "Respond with only a JSON object that matches this JSON Schema. \
Do not wrap it in markdown and do not add any explanation.";

/// Append output instructions and the schema, rendered as JSON Schema, to a
/// prompt.
#[must_use]
pub fn frame_prompt(prompt: &str, schema: &SchemaDescriptor) -> String {
    let rendered = schema.to_json_schema();
    let rendered = serde_json::to_string_pretty(&rendered).unwrap_or_else(|_| rendered.to_string());
    format!("{}\n\n{JSON_INSTRUCTIONS}\n\n{rendered}", prompt.trim_end())
}
