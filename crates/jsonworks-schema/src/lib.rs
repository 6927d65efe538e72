//! `jsonworks-schema` — a JSON Schema evaluation engine.
//!
//! # Overview
//!
//! Supports drafts 6, 7, 2019-09, 2020-12 and the rolling "next" draft, with
//! annotation propagation (`unevaluatedProperties`, `unevaluatedItems`,
//! `contains` bounds), static and dynamic references across a schema
//! registry, and the Flag, List and Hierarchical output formats.
//!
//! # Example
//!
//! ```
//! use jsonworks_schema::{EvalOptions, JsonSchema, OutputFormat};
//! use serde_json::json;
//!
//! let schema = JsonSchema::from_value(json!({
//!     "type": "integer",
//!     "minimum": 3
//! })).unwrap();
//!
//! let options = EvalOptions::new().with_output_format(OutputFormat::Flag);
//! let results = schema.evaluate(&json!(5), &options).unwrap();
//! assert!(results.valid());
//!
//! let results = schema.evaluate(&json!(2), &options).unwrap();
//! assert!(!results.valid());
//! ```

pub mod context;
pub mod draft;
pub mod error;
pub mod formats;
pub mod keyword;
pub mod keywords;
pub mod messages;
pub mod options;
pub mod reference;
pub mod registry;
pub mod result;
pub mod schema;
pub mod vocabulary;

// Re-export the core public API
pub use draft::Draft;
pub use error::SchemaError;
pub use options::{EvalOptions, OutputFormat, TraceEvent};
pub use registry::{FetchFn, Resource, SchemaRegistry};
pub use result::{EvaluationResults, ResultNode};
pub use schema::{JsonSchema, Schema, SchemaKind};
pub use vocabulary::{Vocabulary, VocabularySet};
