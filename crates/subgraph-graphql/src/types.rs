//! Type and field declarations.
//!
//! Types are declared with a small builder API instead of annotations:
//!
//! ```
//! use subgraph_graphql::{FieldDefinition, FieldType, TypeDefinition};
//!
//! let user = TypeDefinition::object("User")
//!     .key("id")
//!     .field(FieldDefinition::new("id", FieldType::id()))
//!     .field(FieldDefinition::new("firstName", FieldType::string()).nullable());
//!
//! assert!(user.is_entity());
//! ```
//!
//! Fields are non-null unless marked [`FieldDefinition::nullable`].

use std::fmt;

use async_graphql::dynamic::TypeRef;
use async_graphql_parser::types::{BaseType, Type};

/// Scalars every schema provides.
pub const BUILTIN_SCALARS: [&str; 5] = ["String", "Int", "Float", "Boolean", "ID"];

/// Returns true for `String`, `Int`, `Float`, `Boolean` and `ID`.
pub fn is_builtin_scalar(name: &str) -> bool {
    BUILTIN_SCALARS.contains(&name)
}

/// The declared type of a field or argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Named { name: String, nullable: bool },
    List { of: Box<FieldType>, nullable: bool },
}

impl FieldType {
    /// Non-null reference to a named type.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named {
            name: name.into(),
            nullable: false,
        }
    }

    pub fn string() -> Self {
        Self::named("String")
    }

    pub fn int() -> Self {
        Self::named("Int")
    }

    pub fn float() -> Self {
        Self::named("Float")
    }

    pub fn boolean() -> Self {
        Self::named("Boolean")
    }

    pub fn id() -> Self {
        Self::named("ID")
    }

    /// Non-null list of `of`.
    pub fn list(of: FieldType) -> Self {
        Self::List {
            of: Box::new(of),
            nullable: false,
        }
    }

    /// Same type with the outermost level made nullable.
    #[must_use]
    pub fn nullable(self) -> Self {
        match self {
            Self::Named { name, .. } => Self::Named {
                name,
                nullable: true,
            },
            Self::List { of, .. } => Self::List { of, nullable: true },
        }
    }

    pub fn is_nullable(&self) -> bool {
        match self {
            Self::Named { nullable, .. } | Self::List { nullable, .. } => *nullable,
        }
    }

    /// Innermost named type.
    pub fn base_name(&self) -> &str {
        match self {
            Self::Named { name, .. } => name,
            Self::List { of, .. } => of.base_name(),
        }
    }

    /// Converts to the engine's type reference.
    pub fn to_type_ref(&self) -> TypeRef {
        let (inner, nullable) = match self {
            Self::Named { name, nullable } => (TypeRef::named(name.clone()), *nullable),
            Self::List { of, nullable } => (TypeRef::List(Box::new(of.to_type_ref())), *nullable),
        };
        if nullable {
            inner
        } else {
            TypeRef::NonNull(Box::new(inner))
        }
    }

    /// Converts from a parsed SDL type.
    pub fn from_ast(ty: &Type) -> Self {
        match &ty.base {
            BaseType::Named(name) => Self::Named {
                name: name.to_string(),
                nullable: ty.nullable,
            },
            BaseType::List(of) => Self::List {
                of: Box::new(Self::from_ast(of)),
                nullable: ty.nullable,
            },
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named { name, .. } => write!(f, "{name}")?,
            Self::List { of, .. } => write!(f, "[{of}]")?,
        }
        if !self.is_nullable() {
            f.write_str("!")?;
        }
        Ok(())
    }
}

/// A field argument, or a directive argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentDefinition {
    pub name: String,
    pub ty: FieldType,
    pub description: Option<String>,
    /// Default value as a GraphQL literal, e.g. `true` or `"No longer supported"`.
    pub default_value: Option<String>,
}

impl ArgumentDefinition {
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            description: None,
            default_value: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn default_value(mut self, literal: impl Into<String>) -> Self {
        self.default_value = Some(literal.into());
        self
    }
}

impl fmt::Display for ArgumentDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.ty)?;
        if let Some(default) = &self.default_value {
            write!(f, " = {default}")?;
        }
        Ok(())
    }
}

/// Federation annotations carried by a single field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldFederation {
    pub external: bool,
    pub requires: Option<String>,
    pub provides: Option<String>,
    pub shareable: bool,
}

/// A field on an object type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDefinition {
    pub name: String,
    pub ty: FieldType,
    pub arguments: Vec<ArgumentDefinition>,
    pub description: Option<String>,
    pub federation: FieldFederation,
    /// Must be served by a registered resolver rather than the parent's property.
    pub resolved: bool,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            arguments: Vec::new(),
            description: None,
            federation: FieldFederation::default(),
            resolved: false,
        }
    }

    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.ty = self.ty.nullable();
        self
    }

    #[must_use]
    pub fn argument(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.arguments.push(ArgumentDefinition::new(name, ty));
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn resolved(mut self) -> Self {
        self.resolved = true;
        self
    }

    #[must_use]
    pub fn external(mut self) -> Self {
        self.federation.external = true;
        self
    }

    #[must_use]
    pub fn requires(mut self, fields: impl Into<String>) -> Self {
        self.federation.requires = Some(fields.into());
        self
    }

    #[must_use]
    pub fn provides(mut self, fields: impl Into<String>) -> Self {
        self.federation.provides = Some(fields.into());
        self
    }

    #[must_use]
    pub fn shareable(mut self) -> Self {
        self.federation.shareable = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Object,
    Scalar,
}

/// A named output type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDefinition {
    pub name: String,
    pub kind: TypeKind,
    pub description: Option<String>,
    pub fields: Vec<FieldDefinition>,
    /// Entity key field sets, e.g. `"id"` or `"sku owner { id }"`.
    pub keys: Vec<String>,
    pub extends: bool,
}

impl TypeDefinition {
    pub fn object(name: impl Into<String>) -> Self {
        Self::with_kind(name, TypeKind::Object)
    }

    /// A custom scalar serialized as arbitrary JSON.
    pub fn scalar(name: impl Into<String>) -> Self {
        Self::with_kind(name, TypeKind::Scalar)
    }

    fn with_kind(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            description: None,
            fields: Vec::new(),
            keys: Vec::new(),
            extends: false,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn key(mut self, fields: impl Into<String>) -> Self {
        self.keys.push(fields.into());
        self
    }

    #[must_use]
    pub fn extends(mut self) -> Self {
        self.extends = true;
        self
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_entity(&self) -> bool {
        !self.keys.is_empty()
    }

    pub fn is_object(&self) -> bool {
        self.kind == TypeKind::Object
    }
}
