//! The sample `users` function.
//!
//! Replace this module to build a different subgraph: it only declares
//! types, resolvers, orphaned types and entity reference resolvers. Schema
//! assembly, serving and publishing are handled by the server.

pub mod data;

use serde_json::Value;
use subgraph_graphql::{
    DirectiveDefinition, FieldDefinition, FieldType, ReferenceResolvers, ResolverError,
    ResolverInput, ResolverRegistry, ResolverResult, TypeDefinition,
};

use self::data::{find_user_by_id, mock_users};

/// Everything the server needs to build the subgraph schema.
#[derive(Debug, Clone)]
pub struct FunctionDefinition {
    pub types: Vec<TypeDefinition>,
    pub resolvers: ResolverRegistry,
    pub directives: Vec<DirectiveDefinition>,
    pub orphans: Vec<String>,
    pub references: ReferenceResolvers,
}

pub fn definition() -> FunctionDefinition {
    FunctionDefinition {
        types: type_definitions(),
        resolvers: resolvers(),
        directives: Vec::new(),
        orphans: vec!["User".to_string()],
        references: reference_resolvers(),
    }
}

pub fn type_definitions() -> Vec<TypeDefinition> {
    let user = TypeDefinition::object("User")
        .key("id")
        .field(FieldDefinition::new("id", FieldType::id()))
        .field(FieldDefinition::new("firstName", FieldType::string()).nullable())
        .field(FieldDefinition::new("lastName", FieldType::string()).nullable());

    let query = TypeDefinition::object("Query")
        .field(FieldDefinition::new("allUsers", FieldType::list(FieldType::named("User"))))
        .field(
            FieldDefinition::new("findUserById", FieldType::named("User").nullable())
                .argument("id", FieldType::string()),
        );

    vec![user, query]
}

pub fn resolvers() -> ResolverRegistry {
    let mut resolvers = ResolverRegistry::new();
    resolvers
        .query("allUsers", |_| async { to_json(mock_users()) })
        .query("findUserById", |input: ResolverInput| async move {
            let id = input
                .str_arg("id")
                .ok_or_else(|| ResolverError::new("`id` is required"))?;
            match find_user_by_id(id) {
                Some(user) => to_json(user),
                None => Ok(None),
            }
        });
    resolvers
}

pub fn reference_resolvers() -> ReferenceResolvers {
    let mut references = ReferenceResolvers::new();
    references.register("User", |reference: Value| async move {
        match reference.get("id").and_then(Value::as_str).and_then(find_user_by_id) {
            Some(user) => to_json(user),
            None => Ok(None),
        }
    });
    references
}

fn to_json(value: impl serde::Serialize) -> ResolverResult {
    serde_json::to_value(value)
        .map(Some)
        .map_err(|e| ResolverError::new(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mock_users() {
        assert_eq!(mock_users().len(), 3);
        assert_eq!(find_user_by_id("456").unwrap().first_name.as_deref(), Some("Gollum"));
        assert!(find_user_by_id("000").is_none());
    }

    #[test]
    fn test_user_serializes_camel_case() {
        let value = to_json(find_user_by_id("123").unwrap()).unwrap().unwrap();
        assert_eq!(value, json!({"id": "123", "firstName": "Bilbo", "lastName": "Baggins"}));
    }
}
