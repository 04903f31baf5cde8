//! Error types for schema assembly.
//!
//! Every variant is fatal: a schema that fails to build must never be served.

/// Errors raised while compiling or federating the schema.
#[derive(Debug, thiserror::Error)]
pub enum SchemaBuildError {
    /// Two declarations share a name but differ in shape.
    #[error("type `{name}` is declared more than once with different shapes")]
    ConflictingType { name: String },

    #[error("object type `{name}` declares no fields")]
    EmptyType { name: String },

    #[error("field `{type_name}.{field}` is declared more than once")]
    DuplicateField { type_name: String, field: String },

    #[error("schema has no `Query` type with at least one field")]
    MissingQueryRoot,

    #[error("field `{type_name}.{field}` references unknown type `{referenced}`")]
    UnknownType {
        type_name: String,
        field: String,
        referenced: String,
    },

    #[error(
        "argument `{argument}` of `{type_name}.{field}` must be a scalar, got `{referenced}`"
    )]
    InvalidArgumentType {
        type_name: String,
        field: String,
        argument: String,
        referenced: String,
    },

    #[error("field `{type_name}.{field}` requires a resolver but none is registered")]
    MissingResolver { type_name: String, field: String },

    #[error("resolver registered for `{type_name}.{field}`, which is not a declared field")]
    UnknownResolverTarget { type_name: String, field: String },

    #[error("directive `@{name}` is defined more than once with different definitions")]
    DirectiveConflict { name: String },

    #[error("printed schema could not be re-parsed: {0}")]
    InvalidDocument(String),

    #[error("orphaned type `{name}` is not a declared type")]
    UnknownOrphan { name: String },

    #[error("key `{fields}` on `{type_name}` is malformed: {reason}")]
    MalformedKey {
        type_name: String,
        fields: String,
        reason: String,
    },

    #[error("entity `{type_name}` declares a key but has no reference resolver")]
    MissingReferenceResolver { type_name: String },

    #[error("reference resolver registered for `{type_name}`, which is not a keyed type")]
    UnexpectedReferenceResolver { type_name: String },

    #[error(
        "entity `{type_name}` is not reachable from a root field and is not listed as an orphaned type"
    )]
    UnreachableEntity { type_name: String },

    /// Rejected by the GraphQL engine itself.
    #[error("schema engine rejected the schema: {0}")]
    Engine(String),
}

impl SchemaBuildError {
    /// Returns a stable code for log aggregation.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ConflictingType { .. } | Self::DuplicateField { .. } => "CONFLICTING_DEFINITION",
            Self::EmptyType { .. } => "EMPTY_TYPE",
            Self::MissingQueryRoot => "MISSING_QUERY_ROOT",
            Self::UnknownType { .. } | Self::InvalidArgumentType { .. } => "INVALID_TYPE_REFERENCE",
            Self::MissingResolver { .. } | Self::UnknownResolverTarget { .. } => {
                "UNRESOLVED_RESOLVER"
            }
            Self::DirectiveConflict { .. } => "DIRECTIVE_CONFLICT",
            Self::InvalidDocument(_) | Self::Engine(_) => "INVALID_SCHEMA",
            Self::UnknownOrphan { .. } | Self::UnreachableEntity { .. } => "ORPHAN_TYPES",
            Self::MalformedKey { .. } => "MALFORMED_KEY",
            Self::MissingReferenceResolver { .. } | Self::UnexpectedReferenceResolver { .. } => {
                "REFERENCE_RESOLVER"
            }
        }
    }
}
