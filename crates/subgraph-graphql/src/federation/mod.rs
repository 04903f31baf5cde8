//! Federation augmentation.
//!
//! The base schema is printed to SDL, parsed back into a document and rebuilt
//! as an Apollo Federation subgraph schema: entity keys and field annotations
//! are applied, orphaned types are kept, and every entity gets its reference
//! resolver bound behind the `_entities` entry point.

pub mod key;
mod service;

pub(crate) use service::{FederationExtension, MissingEntities};

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use async_graphql::SDLExportOptions;
use async_graphql::dynamic::Schema;
use async_graphql_parser::parse_schema;
use async_graphql_parser::types::{self as ast, TypeSystemDefinition};
use indexmap::IndexMap;
use tracing::{debug, info};

pub use key::KeySelection;

use crate::compiler::{BaseSchema, EntityBinding, assemble};
use crate::directives::{DirectiveDefinition, DirectiveSet};
use crate::error::SchemaBuildError;
use crate::resolver::ReferenceResolvers;
use crate::types::{ArgumentDefinition, FieldDefinition, FieldType, TypeDefinition};
use crate::{MUTATION_TYPE, QUERY_TYPE};

/// Turns a [`BaseSchema`] into a [`FederatedSchema`].
///
/// ```ignore
/// let mut references = ReferenceResolvers::new();
/// references.register("User", |reference| async move { Ok(find_user(&reference["id"])) });
///
/// let federated = FederationAugmenter::new()
///     .orphan("User")
///     .reference_resolvers(references)
///     .augment(&base)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct FederationAugmenter {
    directives: Vec<DirectiveDefinition>,
    orphans: Vec<String>,
    references: ReferenceResolvers,
}

impl FederationAugmenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a caller-defined directive.
    #[must_use]
    pub fn directive(mut self, definition: DirectiveDefinition) -> Self {
        self.directives.push(definition);
        self
    }

    #[must_use]
    pub fn directives(mut self, definitions: impl IntoIterator<Item = DirectiveDefinition>) -> Self {
        self.directives.extend(definitions);
        self
    }

    /// Keeps `type_name` in the schema even if no root field reaches it.
    #[must_use]
    pub fn orphan(mut self, type_name: impl Into<String>) -> Self {
        self.orphans.push(type_name.into());
        self
    }

    #[must_use]
    pub fn orphans<I, S>(mut self, type_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.orphans.extend(type_names.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn reference_resolvers(mut self, references: ReferenceResolvers) -> Self {
        self.references = references;
        self
    }

    /// Builds the federated schema.
    ///
    /// # Errors
    ///
    /// Fails on directive conflicts, unknown orphans, malformed keys,
    /// entities without a reference resolver (or the reverse), and entities
    /// that would be missing from the published schema.
    pub fn augment(&self, base: &BaseSchema) -> Result<FederatedSchema, SchemaBuildError> {
        let directives = DirectiveSet::union(self.directives.iter().cloned())?;

        let document = parse_schema(base.sdl())
            .map_err(|e| SchemaBuildError::InvalidDocument(e.to_string()))?;
        let types = rebuild_types(&document, base.types());

        for orphan in &self.orphans {
            if !types.contains_key(orphan) {
                return Err(SchemaBuildError::UnknownOrphan {
                    name: orphan.clone(),
                });
            }
        }

        let retained = reachable(
            &types,
            [QUERY_TYPE, MUTATION_TYPE]
                .into_iter()
                .chain(self.orphans.iter().map(String::as_str)),
        );

        let mut keys: IndexMap<String, Vec<KeySelection>> = IndexMap::new();
        for ty in types.values().filter(|t| t.is_entity()) {
            let mut selections = Vec::with_capacity(ty.keys.len());
            for fields in &ty.keys {
                let selection = KeySelection::parse(fields)
                    .and_then(|selection| selection.validate(ty, &types).map(|()| selection))
                    .map_err(|reason| SchemaBuildError::MalformedKey {
                        type_name: ty.name.clone(),
                        fields: fields.clone(),
                        reason,
                    })?;
                selections.push(selection);
            }

            if !retained.contains(ty.name.as_str()) {
                return Err(SchemaBuildError::UnreachableEntity {
                    type_name: ty.name.clone(),
                });
            }
            if !self.references.contains(&ty.name) {
                return Err(SchemaBuildError::MissingReferenceResolver {
                    type_name: ty.name.clone(),
                });
            }
            keys.insert(ty.name.clone(), selections);
        }

        if let Some(unexpected) = self.references.type_names().find(|name| !keys.contains_key(*name)) {
            return Err(SchemaBuildError::UnexpectedReferenceResolver {
                type_name: unexpected.to_string(),
            });
        }

        let types: IndexMap<String, TypeDefinition> = types
            .into_iter()
            .filter(|(name, _)| {
                let keep = retained.contains(name.as_str());
                if !keep {
                    debug!(type_name = %name, "Dropping type unreachable from root fields");
                }
                keep
            })
            .collect();

        let entities: Vec<String> = keys.keys().cloned().collect();
        let published_sdl = Arc::new(OnceLock::new());
        let schema = assemble(
            &types,
            base.resolvers(),
            base.options(),
            Some(EntityBinding {
                references: self.references.clone(),
                keys: Arc::new(keys),
                published_sdl: published_sdl.clone(),
            }),
        )?;

        let mut sdl = schema.sdl_with_options(SDLExportOptions::new().federation());
        let caller_sdl = directives.caller_sdl();
        if !caller_sdl.is_empty() {
            if !sdl.ends_with('\n') {
                sdl.push('\n');
            }
            sdl.push('\n');
            sdl.push_str(&caller_sdl);
        }
        // `_service { sdl }` answers with the artifact text.
        let _ = published_sdl.set(sdl.clone());

        info!(
            types = types.len(),
            entities = entities.len(),
            orphans = self.orphans.len(),
            directives = directives.len(),
            "Federated schema built"
        );

        Ok(FederatedSchema {
            schema,
            sdl,
            directives,
            entities,
            orphans: self.orphans.clone(),
        })
    }
}

/// The subgraph schema that is served and published.
#[derive(Clone)]
pub struct FederatedSchema {
    schema: Schema,
    sdl: String,
    directives: DirectiveSet,
    entities: Vec<String>,
    orphans: Vec<String>,
}

impl FederatedSchema {
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Federation SDL followed by the caller-defined directive definitions.
    pub fn sdl(&self) -> &str {
        &self.sdl
    }

    pub fn directives(&self) -> &DirectiveSet {
        &self.directives
    }

    /// Keyed types, in declaration order.
    pub fn entities(&self) -> &[String] {
        &self.entities
    }

    pub fn orphans(&self) -> &[String] {
        &self.orphans
    }

    /// Writes the SDL artifact, creating parent directories as needed.
    pub async fn write_sdl(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, &self.sdl).await?;
        debug!(path = %path.display(), bytes = self.sdl.len(), "Wrote schema artifact");
        Ok(())
    }
}

impl std::fmt::Debug for FederatedSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FederatedSchema")
            .field("entities", &self.entities)
            .field("orphans", &self.orphans)
            .field("directives", &self.directives.len())
            .finish_non_exhaustive()
    }
}

/// Rebuilds type declarations from the parsed SDL.
///
/// Shapes come from the document; annotations the printer does not know
/// about (keys, field federation flags, resolver requirements) are carried
/// over from the base declarations by name. Declaration order is kept.
fn rebuild_types(
    document: &ast::ServiceDocument,
    base: &IndexMap<String, TypeDefinition>,
) -> IndexMap<String, TypeDefinition> {
    let mut types = IndexMap::new();

    for definition in &document.definitions {
        let TypeSystemDefinition::Type(ty) = definition else {
            continue;
        };
        let ty = &ty.node;
        let name = ty.name.node.to_string();
        let declared = base.get(&name);

        let rebuilt = match &ty.kind {
            ast::TypeKind::Scalar => TypeDefinition::scalar(&name),
            ast::TypeKind::Object(object) => {
                let mut rebuilt = TypeDefinition::object(&name);
                for field in &object.fields {
                    let declared_field = declared.and_then(|d| d.get_field(&field.node.name.node));
                    rebuilt.fields.push(rebuild_field(&field.node, declared_field));
                }
                if let Some(declared) = declared {
                    rebuilt.keys = declared.keys.clone();
                    rebuilt.extends = declared.extends;
                }
                rebuilt
            }
            _ => continue,
        };

        let description = ty
            .description
            .as_ref()
            .map(|d| d.node.clone())
            .or_else(|| declared.and_then(|d| d.description.clone()));
        types.insert(name, TypeDefinition { description, ..rebuilt });
    }

    let mut ordered = IndexMap::with_capacity(base.len());
    for (name, declared) in base {
        let rebuilt = types.shift_remove(name).unwrap_or_else(|| {
            debug!(type_name = %name, "Type missing from printed SDL, using declaration");
            declared.clone()
        });
        ordered.insert(name.clone(), rebuilt);
    }
    ordered.extend(types);
    ordered
}

fn rebuild_field(field: &ast::FieldDefinition, declared: Option<&FieldDefinition>) -> FieldDefinition {
    let mut rebuilt = FieldDefinition::new(field.name.node.to_string(), FieldType::from_ast(&field.ty.node));

    for argument in &field.arguments {
        let argument = &argument.node;
        let name = argument.name.node.to_string();
        let declared_argument = declared.and_then(|d| d.arguments.iter().find(|a| a.name == name));

        rebuilt.arguments.push(ArgumentDefinition {
            ty: FieldType::from_ast(&argument.ty.node),
            description: argument
                .description
                .as_ref()
                .map(|d| d.node.clone())
                .or_else(|| declared_argument.and_then(|a| a.description.clone())),
            default_value: declared_argument
                .and_then(|a| a.default_value.clone())
                .or_else(|| argument.default_value.as_ref().map(|v| v.node.to_string())),
            name,
        });
    }

    rebuilt.description = field
        .description
        .as_ref()
        .map(|d| d.node.clone())
        .or_else(|| declared.and_then(|d| d.description.clone()));
    if let Some(declared) = declared {
        rebuilt.federation = declared.federation.clone();
        rebuilt.resolved = declared.resolved;
    }
    rebuilt
}

/// Names of the types reachable from `roots` through field and argument types.
fn reachable<'a>(
    types: &'a IndexMap<String, TypeDefinition>,
    roots: impl IntoIterator<Item = &'a str>,
) -> HashSet<String> {
    let mut seen = HashSet::new();
    let mut pending: Vec<&str> = roots.into_iter().collect();

    while let Some(name) = pending.pop() {
        let Some((name, ty)) = types.get_key_value(name) else {
            continue;
        };
        if !seen.insert(name.clone()) {
            continue;
        }
        for field in &ty.fields {
            pending.push(field.ty.base_name());
            pending.extend(field.arguments.iter().map(|a| a.ty.base_name()));
        }
    }

    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::SchemaCompiler;
    use crate::resolver::ResolverRegistry;
    use serde_json::json;

    fn base(extra: impl IntoIterator<Item = TypeDefinition>) -> BaseSchema {
        let query = TypeDefinition::object("Query")
            .field(FieldDefinition::new("ping", FieldType::string()));
        let mut resolvers = ResolverRegistry::new();
        resolvers.query("ping", |_| async { Ok(Some(json!("pong"))) });

        SchemaCompiler::default()
            .compile(std::iter::once(query).chain(extra), resolvers)
            .unwrap()
    }

    fn user() -> TypeDefinition {
        TypeDefinition::object("User")
            .key("id")
            .field(FieldDefinition::new("id", FieldType::id()))
            .field(FieldDefinition::new("name", FieldType::string()).nullable())
    }

    fn user_references() -> ReferenceResolvers {
        let mut references = ReferenceResolvers::new();
        references.register("User", |reference| async move { Ok(Some(reference)) });
        references
    }

    #[test]
    fn test_unreachable_types_are_dropped() {
        let note = TypeDefinition::object("Note").field(FieldDefinition::new("text", FieldType::string()));
        let federated = FederationAugmenter::new().augment(&base([note])).unwrap();

        assert!(!federated.sdl().contains("type Note"));
        assert!(federated.entities().is_empty());
    }

    #[test]
    fn test_entity_without_orphan_entry_is_rejected() {
        let err = FederationAugmenter::new()
            .reference_resolvers(user_references())
            .augment(&base([user()]))
            .unwrap_err();
        assert!(matches!(err, SchemaBuildError::UnreachableEntity { ref type_name } if type_name == "User"));
    }

    #[test]
    fn test_unknown_orphan() {
        let err = FederationAugmenter::new().orphan("Ghost").augment(&base([])).unwrap_err();
        assert!(matches!(err, SchemaBuildError::UnknownOrphan { ref name } if name == "Ghost"));
    }

    #[test]
    fn test_entity_requires_reference_resolver() {
        let err = FederationAugmenter::new()
            .orphan("User")
            .augment(&base([user()]))
            .unwrap_err();
        assert!(matches!(err, SchemaBuildError::MissingReferenceResolver { .. }));
    }

    #[test]
    fn test_reference_resolver_for_unkeyed_type() {
        let mut references = user_references();
        references.register("Query", |_| async { Ok(None) });

        let err = FederationAugmenter::new()
            .orphan("User")
            .reference_resolvers(references)
            .augment(&base([user()]))
            .unwrap_err();
        assert!(matches!(err, SchemaBuildError::UnexpectedReferenceResolver { ref type_name } if type_name == "Query"));
    }

    #[test]
    fn test_key_must_name_declared_fields() {
        let broken = TypeDefinition::object("User")
            .key("uuid")
            .field(FieldDefinition::new("id", FieldType::id()));

        let err = FederationAugmenter::new()
            .orphan("User")
            .reference_resolvers(user_references())
            .augment(&base([broken]))
            .unwrap_err();
        assert!(matches!(err, SchemaBuildError::MalformedKey { ref fields, .. } if fields == "uuid"));
    }

    #[test]
    fn test_conflicting_caller_directive() {
        let err = FederationAugmenter::new()
            .directive(DirectiveDefinition::new("key"))
            .augment(&base([]))
            .unwrap_err();
        assert!(matches!(err, SchemaBuildError::DirectiveConflict { ref name } if name == "key"));
    }

    #[tokio::test]
    async fn test_served_sdl_matches_artifact() {
        let federated = FederationAugmenter::new()
            .directive(DirectiveDefinition::new("cacheControl").on([crate::directives::DirectiveLocation::Object]))
            .orphan("User")
            .reference_resolvers(user_references())
            .augment(&base([user()]))
            .unwrap();
        assert!(federated.sdl().contains("directive @cacheControl"));

        let response = federated.schema().execute("{ _service { sdl } }").await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        let data = response.data.into_json().unwrap();
        assert_eq!(data["_service"]["sdl"], json!(federated.sdl()));
    }

    #[tokio::test]
    async fn test_write_sdl_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("schema.graphql");

        let federated = FederationAugmenter::new()
            .orphan("User")
            .reference_resolvers(user_references())
            .augment(&base([user()]))
            .unwrap();
        federated.write_sdl(&path).await.unwrap();

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(written, federated.sdl());
        assert!(written.contains("type User"));
    }
}
