//! Directive definitions and the merged directive set.
//!
//! A subgraph schema knows directives from three origins: the GraphQL
//! specification, Apollo Federation, and the service itself. [`DirectiveSet`]
//! holds their union keyed by name. Adding an identical definition twice is a
//! no-op; redefining a name with a different shape is a
//! [`SchemaBuildError::DirectiveConflict`].

use std::fmt::{self, Write as _};

use indexmap::IndexMap;
use indexmap::map::Entry;

use crate::error::SchemaBuildError;
use crate::types::{ArgumentDefinition, FieldType};

/// Where a directive may be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveLocation {
    Query,
    Mutation,
    Subscription,
    Field,
    FragmentDefinition,
    FragmentSpread,
    InlineFragment,
    VariableDefinition,
    Schema,
    Scalar,
    Object,
    FieldDefinition,
    ArgumentDefinition,
    Interface,
    Union,
    Enum,
    EnumValue,
    InputObject,
    InputFieldDefinition,
}

impl DirectiveLocation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Query => "QUERY",
            Self::Mutation => "MUTATION",
            Self::Subscription => "SUBSCRIPTION",
            Self::Field => "FIELD",
            Self::FragmentDefinition => "FRAGMENT_DEFINITION",
            Self::FragmentSpread => "FRAGMENT_SPREAD",
            Self::InlineFragment => "INLINE_FRAGMENT",
            Self::VariableDefinition => "VARIABLE_DEFINITION",
            Self::Schema => "SCHEMA",
            Self::Scalar => "SCALAR",
            Self::Object => "OBJECT",
            Self::FieldDefinition => "FIELD_DEFINITION",
            Self::ArgumentDefinition => "ARGUMENT_DEFINITION",
            Self::Interface => "INTERFACE",
            Self::Union => "UNION",
            Self::Enum => "ENUM",
            Self::EnumValue => "ENUM_VALUE",
            Self::InputObject => "INPUT_OBJECT",
            Self::InputFieldDefinition => "INPUT_FIELD_DEFINITION",
        }
    }
}

/// Which of the three sources contributed a directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveOrigin {
    Specified,
    Federation,
    Caller,
}

/// A `directive @name(...) on ...` definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveDefinition {
    pub name: String,
    pub description: Option<String>,
    pub arguments: Vec<ArgumentDefinition>,
    pub locations: Vec<DirectiveLocation>,
    pub repeatable: bool,
}

impl DirectiveDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            arguments: Vec::new(),
            locations: Vec::new(),
            repeatable: false,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn argument(mut self, argument: ArgumentDefinition) -> Self {
        self.arguments.push(argument);
        self
    }

    #[must_use]
    pub fn on(mut self, locations: impl IntoIterator<Item = DirectiveLocation>) -> Self {
        self.locations.extend(locations);
        self
    }

    #[must_use]
    pub fn repeatable(mut self) -> Self {
        self.repeatable = true;
        self
    }
}

impl fmt::Display for DirectiveDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(description) = &self.description {
            writeln!(f, "\"\"\"{description}\"\"\"")?;
        }
        write!(f, "directive @{}", self.name)?;
        if !self.arguments.is_empty() {
            let args: Vec<String> = self.arguments.iter().map(ToString::to_string).collect();
            write!(f, "({})", args.join(", "))?;
        }
        if self.repeatable {
            f.write_str(" repeatable")?;
        }
        let locations: Vec<&str> = self.locations.iter().map(|l| l.as_str()).collect();
        write!(f, " on {}", locations.join(" | "))
    }
}

/// Union of specification, federation and caller directives.
#[derive(Debug, Clone, Default)]
pub struct DirectiveSet {
    entries: IndexMap<String, (DirectiveOrigin, DirectiveDefinition)>,
}

impl DirectiveSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Directives defined by the GraphQL specification.
    pub fn specified() -> Self {
        use DirectiveLocation as L;

        let definitions = [
            DirectiveDefinition::new("include")
                .argument(ArgumentDefinition::new("if", FieldType::boolean()))
                .on([L::Field, L::FragmentSpread, L::InlineFragment]),
            DirectiveDefinition::new("skip")
                .argument(ArgumentDefinition::new("if", FieldType::boolean()))
                .on([L::Field, L::FragmentSpread, L::InlineFragment]),
            DirectiveDefinition::new("deprecated")
                .argument(
                    ArgumentDefinition::new("reason", FieldType::string().nullable())
                        .default_value("\"No longer supported\""),
                )
                .on([
                    L::FieldDefinition,
                    L::ArgumentDefinition,
                    L::InputFieldDefinition,
                    L::EnumValue,
                ]),
            DirectiveDefinition::new("specifiedBy")
                .argument(ArgumentDefinition::new("url", FieldType::string()))
                .on([L::Scalar]),
            DirectiveDefinition::new("oneOf").on([L::InputObject]),
        ];
        Self::from_trusted(DirectiveOrigin::Specified, definitions)
    }

    /// Apollo Federation v2 directives.
    pub fn federation() -> Self {
        use DirectiveLocation as L;

        let field_set = || FieldType::named("FieldSet");
        let everywhere = [
            L::FieldDefinition,
            L::Object,
            L::Interface,
            L::Union,
            L::ArgumentDefinition,
            L::Scalar,
            L::Enum,
            L::EnumValue,
            L::InputObject,
            L::InputFieldDefinition,
        ];

        let definitions = [
            DirectiveDefinition::new("key")
                .argument(ArgumentDefinition::new("fields", field_set()))
                .argument(
                    ArgumentDefinition::new("resolvable", FieldType::boolean().nullable())
                        .default_value("true"),
                )
                .repeatable()
                .on([L::Object, L::Interface]),
            DirectiveDefinition::new("external").on([L::Object, L::FieldDefinition]),
            DirectiveDefinition::new("requires")
                .argument(ArgumentDefinition::new("fields", field_set()))
                .on([L::FieldDefinition]),
            DirectiveDefinition::new("provides")
                .argument(ArgumentDefinition::new("fields", field_set()))
                .on([L::FieldDefinition]),
            DirectiveDefinition::new("extends").on([L::Object, L::Interface]),
            DirectiveDefinition::new("shareable")
                .repeatable()
                .on([L::Object, L::FieldDefinition]),
            DirectiveDefinition::new("inaccessible").on(everywhere),
            DirectiveDefinition::new("override")
                .argument(ArgumentDefinition::new("from", FieldType::string()))
                .on([L::FieldDefinition]),
            DirectiveDefinition::new("tag")
                .argument(ArgumentDefinition::new("name", FieldType::string()))
                .repeatable()
                .on(everywhere),
            DirectiveDefinition::new("link")
                .argument(ArgumentDefinition::new("url", FieldType::string()))
                .argument(ArgumentDefinition::new(
                    "import",
                    FieldType::list(FieldType::named("link__Import").nullable()).nullable(),
                ))
                .repeatable()
                .on([L::Schema]),
            DirectiveDefinition::new("composeDirective")
                .argument(ArgumentDefinition::new("name", FieldType::string()))
                .repeatable()
                .on([L::Schema]),
            DirectiveDefinition::new("interfaceObject").on([L::Object]),
        ];
        Self::from_trusted(DirectiveOrigin::Federation, definitions)
    }

    /// `specified ∪ federation ∪ caller`, deduplicated by name.
    pub fn union(
        caller: impl IntoIterator<Item = DirectiveDefinition>,
    ) -> Result<Self, SchemaBuildError> {
        let mut set = Self::specified();
        set.merge(&Self::federation())?;
        for definition in caller {
            set.insert(DirectiveOrigin::Caller, definition)?;
        }
        Ok(set)
    }

    // Built-in lists have unique names.
    fn from_trusted(
        origin: DirectiveOrigin,
        definitions: impl IntoIterator<Item = DirectiveDefinition>,
    ) -> Self {
        let entries = definitions
            .into_iter()
            .map(|d| (d.name.clone(), (origin, d)))
            .collect();
        Self { entries }
    }

    /// Adds one definition.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaBuildError::DirectiveConflict`] when the name is taken
    /// by a different definition.
    pub fn insert(
        &mut self,
        origin: DirectiveOrigin,
        definition: DirectiveDefinition,
    ) -> Result<(), SchemaBuildError> {
        match self.entries.entry(definition.name.clone()) {
            Entry::Occupied(existing) => {
                if existing.get().1 == definition {
                    Ok(())
                } else {
                    Err(SchemaBuildError::DirectiveConflict {
                        name: definition.name,
                    })
                }
            }
            Entry::Vacant(slot) => {
                slot.insert((origin, definition));
                Ok(())
            }
        }
    }

    /// Adds every definition of `other`, keeping their origins.
    pub fn merge(&mut self, other: &DirectiveSet) -> Result<(), SchemaBuildError> {
        for (origin, definition) in other.entries.values() {
            self.insert(*origin, definition.clone())?;
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&DirectiveDefinition> {
        self.entries.get(name).map(|(_, d)| d)
    }

    pub fn origin(&self, name: &str) -> Option<DirectiveOrigin> {
        self.entries.get(name).map(|(o, _)| *o)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Definitions contributed by the service itself.
    pub fn caller_defined(&self) -> impl Iterator<Item = &DirectiveDefinition> {
        self.entries
            .values()
            .filter(|(o, _)| *o == DirectiveOrigin::Caller)
            .map(|(_, d)| d)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// SDL for the caller-defined directives, one definition per block.
    pub fn caller_sdl(&self) -> String {
        let mut sdl = String::new();
        for definition in self.caller_defined() {
            let _ = writeln!(sdl, "{definition}\n");
        }
        sdl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_control() -> DirectiveDefinition {
        DirectiveDefinition::new("cacheControl")
            .argument(ArgumentDefinition::new("maxAge", FieldType::int().nullable()))
            .on([DirectiveLocation::FieldDefinition, DirectiveLocation::Object])
    }

    #[test]
    fn test_union_always_contains_spec_and_federation() {
        let set = DirectiveSet::union([]).unwrap();
        for name in ["include", "skip", "deprecated", "specifiedBy", "key", "external", "requires", "provides", "extends"] {
            assert!(set.contains(name), "missing @{name}");
        }
        assert_eq!(set.origin("skip"), Some(DirectiveOrigin::Specified));
        assert_eq!(set.origin("key"), Some(DirectiveOrigin::Federation));
        assert_eq!(set.caller_defined().count(), 0);
    }

    #[test]
    fn test_merging_same_directive_twice_yields_one() {
        let set = DirectiveSet::union([cache_control(), cache_control()]).unwrap();
        let baseline = DirectiveSet::union([]).unwrap();

        assert_eq!(set.len(), baseline.len() + 1);
        assert_eq!(set.caller_defined().count(), 1);
        assert_eq!(set.origin("cacheControl"), Some(DirectiveOrigin::Caller));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut set = DirectiveSet::union([cache_control()]).unwrap();
        let before: Vec<String> = set.names().map(str::to_string).collect();

        let copy = set.clone();
        set.merge(&copy).unwrap();
        set.merge(&DirectiveSet::federation()).unwrap();

        let after: Vec<String> = set.names().map(str::to_string).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_redefining_a_federation_directive_conflicts() {
        let bogus = DirectiveDefinition::new("key").on([DirectiveLocation::FieldDefinition]);
        let err = DirectiveSet::union([bogus]).unwrap_err();
        assert!(matches!(err, SchemaBuildError::DirectiveConflict { ref name } if name == "key"));
    }

    #[test]
    fn test_caller_redefining_spec_directive_identically_is_accepted() {
        let skip = DirectiveSet::specified().get("skip").cloned().unwrap();
        let set = DirectiveSet::union([skip]).unwrap();
        assert_eq!(set.origin("skip"), Some(DirectiveOrigin::Specified));
    }

    #[test]
    fn test_caller_sdl() {
        let set = DirectiveSet::union([cache_control()]).unwrap();
        assert_eq!(
            set.caller_sdl().trim(),
            "directive @cacheControl(maxAge: Int) on FIELD_DEFINITION | OBJECT"
        );
    }
}
