//! Base schema compilation.
//!
//! `SchemaCompiler` validates declared types against the registered resolvers
//! and assembles an executable schema with async-graphql's dynamic schema API.
//! The same assembly code builds the federated schema in
//! [`crate::federation`], with federation annotations and entity resolution
//! switched on.

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use async_graphql::dynamic::{
    Field, FieldFuture, FieldValue, InputValue, Object, ResolverContext, Scalar, Schema,
};
use async_graphql::extensions::Logger;
use async_graphql::Value;
use indexmap::IndexMap;
use indexmap::map::Entry;
use tracing::{debug, trace};

use crate::error::SchemaBuildError;
use crate::federation::{FederationExtension, KeySelection, MissingEntities};
use crate::resolver::{ReferenceResolvers, ResolverInput, ResolverRegistry, json_to_graphql_value};
use crate::types::{FieldDefinition, TypeDefinition, TypeKind, is_builtin_scalar};
use crate::{MUTATION_TYPE, QUERY_TYPE};

/// Engine options applied to every schema built from the same declarations.
#[derive(Debug, Clone)]
pub struct SchemaOptions {
    /// Whether to enable introspection queries.
    pub introspection: bool,

    /// Log every operation and its errors.
    pub debug: bool,
}

impl Default for SchemaOptions {
    fn default() -> Self {
        Self {
            introspection: true,
            debug: false,
        }
    }
}

/// Compiles type declarations and resolvers into a [`BaseSchema`].
///
/// # Example
///
/// ```ignore
/// let mut resolvers = ResolverRegistry::new();
/// resolvers.query("allUsers", |_| async { Ok(Some(json!([]))) });
///
/// let base = SchemaCompiler::new(SchemaOptions::default())
///     .compile([user_type, query_type], resolvers)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct SchemaCompiler {
    options: SchemaOptions,
}

impl SchemaCompiler {
    #[must_use]
    pub fn new(options: SchemaOptions) -> Self {
        Self { options }
    }

    /// Validates and builds the base schema.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaBuildError`] when a type is declared twice with
    /// different shapes, a field references an unknown type, a root field has
    /// no resolver, or a resolver targets a field that does not exist.
    pub fn compile(
        &self,
        types: impl IntoIterator<Item = TypeDefinition>,
        resolvers: ResolverRegistry,
    ) -> Result<BaseSchema, SchemaBuildError> {
        debug!("Starting base schema compilation");

        let types = collect_types(types)?;
        validate_types(&types)?;
        validate_resolvers(&types, &resolvers)?;

        let schema = assemble(&types, &resolvers, &self.options, None)?;
        let sdl = schema.sdl();

        debug!(
            types = types.len(),
            resolvers = resolvers.len(),
            "Base schema compiled"
        );

        Ok(BaseSchema {
            schema,
            sdl,
            types,
            resolvers,
            options: self.options.clone(),
        })
    }
}

/// The executable schema built from the declarations, plus what it was built from.
#[derive(Clone)]
pub struct BaseSchema {
    schema: Schema,
    sdl: String,
    types: IndexMap<String, TypeDefinition>,
    resolvers: ResolverRegistry,
    options: SchemaOptions,
}

impl BaseSchema {
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Textual definition of the base schema.
    pub fn sdl(&self) -> &str {
        &self.sdl
    }

    pub fn types(&self) -> &IndexMap<String, TypeDefinition> {
        &self.types
    }

    pub fn type_definition(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.get(name)
    }

    pub fn resolvers(&self) -> &ResolverRegistry {
        &self.resolvers
    }

    pub fn options(&self) -> &SchemaOptions {
        &self.options
    }
}

impl std::fmt::Debug for BaseSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaseSchema")
            .field("types", &self.types.keys().collect::<Vec<_>>())
            .field("resolvers", &self.resolvers)
            .finish_non_exhaustive()
    }
}

/// Entity resolution wiring for a federated build.
pub(crate) struct EntityBinding {
    pub references: ReferenceResolvers,
    pub keys: Arc<IndexMap<String, Vec<KeySelection>>>,
    /// Text served by `_service { sdl }`, set once the artifact is printed.
    pub published_sdl: Arc<OnceLock<String>>,
}

fn collect_types(
    types: impl IntoIterator<Item = TypeDefinition>,
) -> Result<IndexMap<String, TypeDefinition>, SchemaBuildError> {
    let mut collected: IndexMap<String, TypeDefinition> = IndexMap::new();
    for ty in types {
        if is_builtin_scalar(&ty.name) {
            return Err(SchemaBuildError::ConflictingType { name: ty.name });
        }
        match collected.entry(ty.name.clone()) {
            Entry::Occupied(existing) => {
                if *existing.get() != ty {
                    return Err(SchemaBuildError::ConflictingType { name: ty.name });
                }
                trace!(type_name = %ty.name, "Skipping identical duplicate declaration");
            }
            Entry::Vacant(slot) => {
                slot.insert(ty);
            }
        }
    }
    Ok(collected)
}

fn validate_types(types: &IndexMap<String, TypeDefinition>) -> Result<(), SchemaBuildError> {
    match types.get(QUERY_TYPE) {
        Some(query) if query.is_object() && !query.fields.is_empty() => {}
        _ => return Err(SchemaBuildError::MissingQueryRoot),
    }

    let is_scalar = |name: &str| {
        is_builtin_scalar(name) || types.get(name).is_some_and(|t| t.kind == TypeKind::Scalar)
    };

    for ty in types.values().filter(|t| t.is_object()) {
        if ty.fields.is_empty() && ty.name != MUTATION_TYPE {
            return Err(SchemaBuildError::EmptyType {
                name: ty.name.clone(),
            });
        }

        let mut seen = HashSet::new();
        for field in &ty.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaBuildError::DuplicateField {
                    type_name: ty.name.clone(),
                    field: field.name.clone(),
                });
            }

            let referenced = field.ty.base_name();
            if !is_builtin_scalar(referenced) && !types.contains_key(referenced) {
                return Err(SchemaBuildError::UnknownType {
                    type_name: ty.name.clone(),
                    field: field.name.clone(),
                    referenced: referenced.to_string(),
                });
            }

            for argument in &field.arguments {
                let referenced = argument.ty.base_name();
                if is_scalar(referenced) {
                    continue;
                }
                return Err(if types.contains_key(referenced) {
                    SchemaBuildError::InvalidArgumentType {
                        type_name: ty.name.clone(),
                        field: field.name.clone(),
                        argument: argument.name.clone(),
                        referenced: referenced.to_string(),
                    }
                } else {
                    SchemaBuildError::UnknownType {
                        type_name: ty.name.clone(),
                        field: field.name.clone(),
                        referenced: referenced.to_string(),
                    }
                });
            }
        }
    }

    Ok(())
}

fn validate_resolvers(
    types: &IndexMap<String, TypeDefinition>,
    resolvers: &ResolverRegistry,
) -> Result<(), SchemaBuildError> {
    for ty in types.values().filter(|t| t.is_object()) {
        let is_root = ty.name == QUERY_TYPE || ty.name == MUTATION_TYPE;
        for field in &ty.fields {
            if (is_root || field.resolved) && !resolvers.contains(&ty.name, &field.name) {
                return Err(SchemaBuildError::MissingResolver {
                    type_name: ty.name.clone(),
                    field: field.name.clone(),
                });
            }
        }
    }

    for (type_name, field) in resolvers.targets() {
        let declared = types
            .get(type_name)
            .is_some_and(|t| t.is_object() && t.get_field(field).is_some());
        if !declared {
            return Err(SchemaBuildError::UnknownResolverTarget {
                type_name: type_name.to_string(),
                field: field.to_string(),
            });
        }
    }

    Ok(())
}

/// Builds an executable schema from validated declarations.
pub(crate) fn assemble(
    types: &IndexMap<String, TypeDefinition>,
    resolvers: &ResolverRegistry,
    options: &SchemaOptions,
    entities: Option<EntityBinding>,
) -> Result<Schema, SchemaBuildError> {
    let federated = entities.is_some();
    let mutation = types
        .get(MUTATION_TYPE)
        .filter(|t| !t.fields.is_empty())
        .map(|_| MUTATION_TYPE);

    let mut schema_builder = Schema::build(QUERY_TYPE, mutation, None);

    for ty in types.values() {
        match ty.kind {
            TypeKind::Scalar => {
                let mut scalar = Scalar::new(ty.name.as_str());
                if let Some(description) = &ty.description {
                    scalar = scalar.description(description.as_str());
                }
                schema_builder = schema_builder.register(scalar);
            }
            TypeKind::Object if ty.fields.is_empty() => {
                trace!(type_name = %ty.name, "Skipping empty root type");
            }
            TypeKind::Object => {
                schema_builder = schema_builder.register(build_object(ty, resolvers, federated));
            }
        }
    }

    if let Some(entities) = entities {
        let EntityBinding {
            references,
            keys,
            published_sdl,
        } = entities;
        schema_builder = schema_builder
            .enable_federation()
            .extension(FederationExtension::new(published_sdl));
        if !references.is_empty() {
            schema_builder = schema_builder.entity_resolver(move |ctx| {
                let references = references.clone();
                let keys = keys.clone();
                FieldFuture::new(async move { resolve_entities(&ctx, &references, &keys).await })
            });
        }
    }

    if !options.introspection {
        schema_builder = schema_builder.disable_introspection();
    }
    if options.debug {
        schema_builder = schema_builder.extension(Logger);
    }

    schema_builder
        .finish()
        .map_err(|e| SchemaBuildError::Engine(e.to_string()))
}

fn build_object(ty: &TypeDefinition, resolvers: &ResolverRegistry, federated: bool) -> Object {
    let mut object = Object::new(ty.name.as_str());
    if let Some(description) = &ty.description {
        object = object.description(description.as_str());
    }
    if federated {
        for key in &ty.keys {
            object = object.key(key.as_str());
        }
        if ty.extends {
            object = object.extends();
        }
    }
    for field in &ty.fields {
        object = object.field(build_field(&ty.name, field, resolvers, federated));
    }
    object
}

fn build_field(
    type_name: &str,
    definition: &FieldDefinition,
    resolvers: &ResolverRegistry,
    federated: bool,
) -> Field {
    let resolver = resolvers.get(type_name, &definition.name).cloned();
    let name = definition.name.clone();

    let mut field = Field::new(
        definition.name.as_str(),
        definition.ty.to_type_ref(),
        move |ctx| {
            let resolver = resolver.clone();
            let name = name.clone();
            FieldFuture::new(async move {
                match resolver {
                    Some(resolver) => {
                        let input = ResolverInput::from_context(&ctx)?;
                        let value = resolver(input).await?;
                        Ok(value.and_then(into_field_value))
                    }
                    None => Ok(parent_property(&ctx, &name).map(FieldValue::value)),
                }
            })
        },
    );

    if let Some(description) = &definition.description {
        field = field.description(description.as_str());
    }

    for argument in &definition.arguments {
        let mut input = InputValue::new(argument.name.as_str(), argument.ty.to_type_ref());
        if let Some(description) = &argument.description {
            input = input.description(description.as_str());
        }
        if let Some(Ok(default)) = argument
            .default_value
            .as_deref()
            .map(serde_json::from_str::<serde_json::Value>)
        {
            input = input.default_value(json_to_graphql_value(default));
        }
        field = field.argument(input);
    }

    if federated {
        let federation = &definition.federation;
        if federation.external {
            field = field.external();
        }
        if let Some(requires) = &federation.requires {
            field = field.requires(requires.as_str());
        }
        if let Some(provides) = &federation.provides {
            field = field.provides(provides.as_str());
        }
        if federation.shareable {
            field = field.shareable();
        }
    }

    field
}

/// Reads `name` off the parent object value.
fn parent_property(ctx: &ResolverContext<'_>, name: &str) -> Option<Value> {
    match ctx.parent_value.as_value() {
        Some(Value::Object(obj)) => obj.get(name).filter(|v| **v != Value::Null).cloned(),
        _ => None,
    }
}

fn into_field_value<'a>(json: serde_json::Value) -> Option<FieldValue<'a>> {
    match json {
        serde_json::Value::Null => None,
        other => Some(FieldValue::value(json_to_graphql_value(other))),
    }
}

/// The `_entities` handler: dispatches each representation to the reference
/// resolver registered for its `__typename`.
async fn resolve_entities<'a>(
    ctx: &ResolverContext<'a>,
    references: &ReferenceResolvers,
    keys: &IndexMap<String, Vec<KeySelection>>,
) -> async_graphql::Result<Option<FieldValue<'a>>> {
    let representations = ctx.args.try_get("representations")?.list()?;
    let response_key = ctx.ctx.item.node.response_key().node.as_str();
    let mut entities = Vec::with_capacity(representations.len());

    for (index, item) in representations.iter().enumerate() {
        let typename = item.object()?.try_get("__typename")?.string()?.to_string();
        let resolver = references.get(&typename).ok_or_else(|| {
            async_graphql::Error::new(format!("`{typename}` is not an entity of this subgraph"))
        })?;

        let representation = item.as_value().clone().into_json()?;
        let reference = match keys.get(&typename) {
            Some(selections) if !selections.is_empty() => selections
                .iter()
                .find(|key| key.is_satisfied_by(&representation))
                .unwrap_or(&selections[0])
                .project(&representation),
            _ => representation,
        };

        trace!(entity = %typename, %reference, "Resolving entity reference");
        match resolver(reference).await? {
            Some(entity) => entities.push(
                FieldValue::value(json_to_graphql_value(entity)).with_type(typename),
            ),
            None => {
                // Placeholder keeps the union shape; the federation extension answers `null`.
                if let Some(missing) = ctx.data_opt::<MissingEntities>() {
                    missing.insert(response_key, index);
                }
                entities.push(FieldValue::NULL.with_type(typename));
            }
        }
    }

    Ok(Some(FieldValue::list(entities)))
}
