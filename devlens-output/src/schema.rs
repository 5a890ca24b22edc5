//! Schema descriptors.
//!
//! A [`SchemaDescriptor`] describes the object a model is asked to return. It
//! drives coercion, structural validation and the JSON Schema embedded in the
//! prompt.

use indexmap::IndexMap;
use serde_json::{json, Map, Value as JsonValue};

/// The kind of a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// A string.
    String,
    /// A number. String values are read as percentages during coercion.
    Number,
    /// A boolean.
    Boolean,
    /// One of a fixed set of strings, in canonical casing.
    Enum(Vec<String>),
    /// An array whose items all have the given kind.
    Array(Box<FieldKind>),
    /// A nested object.
    Object(ObjectSchema),
}

impl FieldKind {
    /// Create an enum kind.
    pub fn enumeration<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Enum(members.into_iter().map(Into::into).collect())
    }

    /// Create an array kind.
    #[must_use]
    pub fn array(items: FieldKind) -> Self {
        Self::Array(Box::new(items))
    }

    /// Human readable description used in validation errors.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::String => "string".to_string(),
            Self::Number => "number".to_string(),
            Self::Boolean => "boolean".to_string(),
            Self::Enum(members) => format!("one of [{}]", members.join(", ")),
            Self::Array(items) => format!("array of {}", items.describe()),
            Self::Object(_) => "object".to_string(),
        }
    }

    /// Render as JSON Schema.
    #[must_use]
    pub fn to_json_schema(&self) -> JsonValue {
        match self {
            Self::String => json!({"type": "string"}),
            Self::Number => json!({"type": "number"}),
            Self::Boolean => json!({"type": "boolean"}),
            Self::Enum(members) => json!({"type": "string", "enum": members}),
            Self::Array(items) => json!({"type": "array", "items": items.to_json_schema()}),
            Self::Object(schema) => schema.to_json_schema(),
        }
    }
}

/// A declared field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    /// The field's kind.
    pub kind: FieldKind,
    /// Whether validation requires the field.
    pub required: bool,
    /// Optional description, forwarded to the model.
    pub description: Option<String>,
}

/// Description of an object with named fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectSchema {
    fields: IndexMap<String, FieldSchema>,
    deny_unknown_fields: bool,
}

/// The caller-supplied description of the expected output.
pub type SchemaDescriptor = ObjectSchema;

impl ObjectSchema {
    /// Create an empty object schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required field.
    #[must_use]
    pub fn field(self, name: &str, kind: FieldKind) -> Self {
        self.with_field(name, kind, true, None)
    }

    /// Add an optional field.
    #[must_use]
    pub fn optional_field(self, name: &str, kind: FieldKind) -> Self {
        self.with_field(name, kind, false, None)
    }

    /// Add a field with every attribute spelled out.
    #[must_use]
    pub fn with_field(
        mut self,
        name: &str,
        kind: FieldKind,
        required: bool,
        description: Option<&str>,
    ) -> Self {
        self.fields.insert(
            name.to_string(),
            FieldSchema {
                kind,
                required,
                description: description.map(str::to_string),
            },
        );
        self
    }

    /// Reject fields the schema does not declare during validation.
    #[must_use]
    pub fn deny_unknown_fields(mut self) -> Self {
        self.deny_unknown_fields = true;
        self
    }

    /// Whether unknown fields are rejected.
    #[must_use]
    pub fn denies_unknown_fields(&self) -> bool {
        self.deny_unknown_fields
    }

    /// Look up a declared field by exact name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.get(name)
    }

    /// Iterate over declared fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldSchema)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of declared fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no fields are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Render as JSON Schema.
    #[must_use]
    pub fn to_json_schema(&self) -> JsonValue {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for (name, field) in &self.fields {
            let mut prop = field.kind.to_json_schema();
            if let (Some(desc), Some(obj)) = (&field.description, prop.as_object_mut()) {
                obj.insert("description".to_string(), json!(desc));
            }
            properties.insert(name.clone(), prop);
            if field.required {
                required.push(name.clone());
            }
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": !self.deny_unknown_fields,
        })
    }
}
