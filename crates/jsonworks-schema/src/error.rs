use thiserror::Error;

/// Fatal failures: schema compilation problems, unresolvable references and
/// evaluation cycles.
///
/// Validation failures are never errors; they are recorded on the result
/// tree. An `Err` from this crate means the evaluation itself could not be
/// carried out.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("invalid \"{keyword}\" at {location}: {reason}")]
    Compile {
        keyword: String,
        location: String,
        reason: String,
    },

    #[error("unsupported meta-schema: {0}")]
    UnknownMetaSchema(String),

    #[error("invalid URI \"{uri}\": {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("cannot resolve \"{reference}\" against {base}")]
    UnresolvedReference { reference: String, base: String },

    #[error("evaluation cycle at {schema_location} for instance {instance_location}")]
    CycleDetected {
        schema_location: String,
        instance_location: String,
    },
}

impl SchemaError {
    pub(crate) fn compile(
        keyword: impl Into<String>,
        location: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        SchemaError::Compile {
            keyword: keyword.into(),
            location: location.into(),
            reason: reason.into(),
        }
    }
}
