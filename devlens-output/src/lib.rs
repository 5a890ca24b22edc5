//! # devlens-output
//!
//! Structured-output recovery for devlens.
//!
//! Language models asked for JSON routinely wrap it in prose or markdown,
//! drop a closing brace, leave trailing commas, or send `"75%"` where a number
//! belongs. This crate turns that text into a value that satisfies a schema.
//!
//! ## Pipeline
//!
//! - **[`extract_candidate`]**: isolate the likely payload (fenced block, brace span)
//! - **[`repair`]**: ordered, idempotent syntax fixes
//! - **[`coerce`]**: schema-guided scalar normalization
//! - **[`validate`]**: structural check plus typed deserialization
//!
//! ## Example
//!
//! ```rust
//! use devlens_output::{coerce, extract_candidate, repair, validate, FieldKind, ObjectSchema};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Verdict {
//!     approved: bool,
//!     score: u32,
//! }
//!
//! let schema = ObjectSchema::new()
//!     .field("approved", FieldKind::Boolean)
//!     .field("score", FieldKind::Number);
//!
//! let raw = "Here you go:\n```json\n{\"approved\": \"yes\", \"score\": \"85%\",}\n```";
//! let candidate = repair(extract_candidate(raw).unwrap());
//! let value = coerce(candidate.parse().unwrap(), &schema);
//! let verdict: Verdict = validate(value, &schema).unwrap();
//! assert!(verdict.approved);
//! assert_eq!(verdict.score, 85);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod coerce;
pub mod error;
pub mod parser;
pub mod repair;
pub mod schema;
pub mod validator;

// Re-exports
pub use coerce::{coerce, coerce_bool, coerce_enum, coerce_percentage};
pub use error::{
    OutputParseError, OutputValidationError, ParseResult, ValidationIssue, ValidationResult,
};
pub use parser::{
    extract_candidate, looks_like_json, parse_json_from_text, parse_json_value, Candidate,
    CandidateSource,
};
pub use repair::{recover_json, repair, repair_json, RepairFix};
pub use schema::{FieldKind, FieldSchema, ObjectSchema, SchemaDescriptor};
pub use validator::{
    check, validate, BoxedValidator, NoOpValidator, OutputValidator, SyncValidator,
};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        coerce, extract_candidate, repair, validate, Candidate, FieldKind, ObjectSchema,
        OutputParseError, OutputValidationError, OutputValidator, SchemaDescriptor,
    };
}
