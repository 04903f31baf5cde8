//! Entity key field sets.
//!
//! A key is a selection set without the outer braces: `"id"`,
//! `"upc sku"`, or `"owner { id } sku"`. The parsed form is used both to
//! validate the key against the declared fields and to cut a representation
//! down to exactly its key fields before it reaches a reference resolver.

use std::fmt;

use async_graphql_parser::parse_query;
use async_graphql_parser::types::{self as ast, DocumentOperations};
use indexmap::IndexMap;
use serde_json::Value;

use crate::types::TypeDefinition;

/// Parsed key field set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySelection {
    fields: Vec<(String, Option<KeySelection>)>,
}

impl KeySelection {
    /// Parses a field set such as `"id"` or `"owner { id } sku"`.
    pub fn parse(input: &str) -> Result<Self, String> {
        if input.trim().is_empty() {
            return Err("empty field set".into());
        }
        let document = parse_query(format!("{{ {input}\n}}")).map_err(|e| e.to_string())?;
        if !document.fragments.is_empty() {
            return Err("fragments are not allowed in a key".into());
        }
        let DocumentOperations::Single(operation) = &document.operations else {
            return Err("a key is a single selection set".into());
        };
        from_selection_set(&operation.node.selection_set.node)
    }

    /// Top-level field names, in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Checks every selected field exists on `ty`, descending into nested
    /// selections through `types`.
    pub fn validate(
        &self,
        ty: &TypeDefinition,
        types: &IndexMap<String, TypeDefinition>,
    ) -> Result<(), String> {
        for (name, nested) in &self.fields {
            let field = ty
                .get_field(name)
                .ok_or_else(|| format!("`{}` has no field `{name}`", ty.name))?;
            let target = types.get(field.ty.base_name());
            match (nested, target) {
                (Some(nested), Some(target)) if target.is_object() => {
                    nested.validate(target, types)?;
                }
                (Some(_), _) => {
                    return Err(format!("`{name}` is not an object field and cannot have a sub-selection"));
                }
                (None, Some(target)) if target.is_object() => {
                    return Err(format!("object field `{name}` needs a sub-selection"));
                }
                (None, _) => {}
            }
        }
        Ok(())
    }

    /// True when `value` carries every selected field.
    pub fn is_satisfied_by(&self, value: &Value) -> bool {
        let Value::Object(obj) = value else {
            return false;
        };
        self.fields.iter().all(|(name, nested)| match (obj.get(name), nested) {
            (Some(child), Some(nested)) => nested.is_satisfied_by(child),
            (Some(_), None) => true,
            (None, _) => false,
        })
    }

    /// Copy of `value` holding only the selected fields.
    pub fn project(&self, value: &Value) -> Value {
        let Value::Object(obj) = value else {
            return Value::Null;
        };
        let mut projected = serde_json::Map::new();
        for (name, nested) in &self.fields {
            if let Some(child) = obj.get(name) {
                let child = match (nested, child) {
                    (Some(nested), Value::Array(items)) => {
                        Value::Array(items.iter().map(|item| nested.project(item)).collect())
                    }
                    (Some(nested), child) => nested.project(child),
                    (None, child) => child.clone(),
                };
                projected.insert(name.clone(), child);
            }
        }
        Value::Object(projected)
    }
}

impl fmt::Display for KeySelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, nested)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(name)?;
            if let Some(nested) = nested {
                write!(f, " {{ {nested} }}")?;
            }
        }
        Ok(())
    }
}

fn from_selection_set(set: &ast::SelectionSet) -> Result<KeySelection, String> {
    let mut fields: Vec<(String, Option<KeySelection>)> = Vec::with_capacity(set.items.len());
    for selection in &set.items {
        let ast::Selection::Field(field) = &selection.node else {
            return Err("fragments are not allowed in a key".into());
        };
        let field = &field.node;
        let name = field.name.node.as_str();
        if field.alias.is_some() {
            return Err(format!("`{name}` is aliased"));
        }
        if !field.arguments.is_empty() {
            return Err(format!("`{name}` has arguments"));
        }
        if !field.directives.is_empty() {
            return Err(format!("`{name}` has directives"));
        }
        if fields.iter().any(|(existing, _)| existing == name) {
            return Err(format!("`{name}` is selected twice"));
        }
        let nested = if field.selection_set.node.items.is_empty() {
            None
        } else {
            Some(from_selection_set(&field.selection_set.node)?)
        };
        fields.push((name.to_string(), nested));
    }
    Ok(KeySelection { fields })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldDefinition, FieldType};
    use serde_json::json;

    #[test]
    fn test_parse_simple_and_nested() {
        let key = KeySelection::parse("id").unwrap();
        assert_eq!(key.field_names().collect::<Vec<_>>(), vec!["id"]);

        let key = KeySelection::parse("owner { id tenant } sku").unwrap();
        assert_eq!(key.to_string(), "owner { id tenant } sku");
    }

    #[test]
    fn test_parse_rejects_malformed_sets() {
        assert!(KeySelection::parse("").is_err());
        assert!(KeySelection::parse("owner {").is_err());
        assert!(KeySelection::parse("owner { }").is_err());
        assert!(KeySelection::parse("id }").is_err());
        assert!(KeySelection::parse("id id").is_err());
        assert!(KeySelection::parse("1id").is_err());
        assert!(KeySelection::parse("id } { name").is_err());
        assert!(KeySelection::parse("id } fragment F on User { name").is_err());
        assert!(KeySelection::parse("handle: id").is_err());
        assert!(KeySelection::parse("owner(first: 1) { id }").is_err());
        assert!(KeySelection::parse("id @skip(if: true)").is_err());
        assert!(KeySelection::parse("... on User { id }").is_err());
    }

    #[test]
    fn test_parse_accepts_commas_and_comments() {
        let key = KeySelection::parse("upc, owner { id } # primary").unwrap();
        assert_eq!(key.to_string(), "upc owner { id }");
    }

    #[test]
    fn test_project_keeps_only_key_fields() {
        let key = KeySelection::parse("id owner { id }").unwrap();
        let representation = json!({
            "__typename": "Product",
            "id": "p1",
            "name": "ignored",
            "owner": {"id": "u1", "name": "ignored"}
        });

        assert!(key.is_satisfied_by(&representation));
        assert_eq!(
            key.project(&representation),
            json!({"id": "p1", "owner": {"id": "u1"}})
        );
        assert!(!key.is_satisfied_by(&json!({"id": "p1"})));
    }

    #[test]
    fn test_validate_against_declared_fields() {
        let mut types = IndexMap::new();
        let user = TypeDefinition::object("User").field(FieldDefinition::new("id", FieldType::id()));
        let product = TypeDefinition::object("Product")
            .field(FieldDefinition::new("upc", FieldType::string()))
            .field(FieldDefinition::new("owner", FieldType::named("User")));
        types.insert("User".to_string(), user);
        types.insert("Product".to_string(), product.clone());

        assert!(KeySelection::parse("upc owner { id }").unwrap().validate(&product, &types).is_ok());
        assert!(KeySelection::parse("sku").unwrap().validate(&product, &types).is_err());
        assert!(KeySelection::parse("owner").unwrap().validate(&product, &types).is_err());
        assert!(KeySelection::parse("upc { id }").unwrap().validate(&product, &types).is_err());
        assert!(KeySelection::parse("owner { name }").unwrap().validate(&product, &types).is_err());
    }
}
