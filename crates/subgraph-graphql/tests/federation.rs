//! End-to-end tests for compiling and federating a subgraph schema.

use std::sync::{Arc, Mutex};

use async_graphql::{Request, Variables};
use serde_json::{Value, json};
use subgraph_graphql::{
    DirectiveDefinition, DirectiveLocation, FederatedSchema, FederationAugmenter, FieldDefinition,
    FieldType, ReferenceResolvers, ResolverRegistry, SchemaCompiler, SchemaOptions, TypeDefinition,
};

type Calls = Arc<Mutex<Vec<Value>>>;

fn users() -> Vec<Value> {
    vec![
        json!({"id": "1", "firstName": "Bilbo", "lastName": "Baggins", "team": {"id": "t1", "name": "Fellowship"}}),
        json!({"id": "2", "firstName": "Gollum", "lastName": "Precious", "team": {"id": "t2", "name": "Misty"}}),
    ]
}

fn type_definitions() -> Vec<TypeDefinition> {
    vec![
        TypeDefinition::object("User")
            .key("id")
            .field(FieldDefinition::new("id", FieldType::id()))
            .field(FieldDefinition::new("firstName", FieldType::string()).nullable())
            .field(FieldDefinition::new("lastName", FieldType::string()).nullable()),
        TypeDefinition::object("Team")
            .field(FieldDefinition::new("id", FieldType::id()))
            .field(FieldDefinition::new("name", FieldType::string())),
        TypeDefinition::object("Membership")
            .key("team { id } id")
            .field(FieldDefinition::new("id", FieldType::id()))
            .field(FieldDefinition::new("team", FieldType::named("Team"))),
        TypeDefinition::object("Query").field(FieldDefinition::new(
            "userCount",
            FieldType::int(),
        )),
    ]
}

fn federate(calls: &Calls, augmenter: FederationAugmenter) -> FederatedSchema {
    let mut resolvers = ResolverRegistry::new();
    resolvers.query("userCount", |_| async { Ok(Some(json!(users().len()))) });

    let base = SchemaCompiler::new(SchemaOptions::default())
        .compile(type_definitions(), resolvers)
        .expect("base schema compiles");

    let mut references = ReferenceResolvers::new();
    let user_calls = calls.clone();
    references.register("User", move |reference: Value| {
        let calls = user_calls.clone();
        async move {
            calls.lock().unwrap().push(reference.clone());
            Ok(users().into_iter().find(|u| u["id"] == reference["id"]))
        }
    });
    let membership_calls = calls.clone();
    references.register("Membership", move |reference: Value| {
        let calls = membership_calls.clone();
        async move {
            calls.lock().unwrap().push(reference.clone());
            Ok(users()
                .into_iter()
                .find(|u| u["id"] == reference["id"])
                .map(|u| json!({"id": u["id"], "team": u["team"]})))
        }
    });

    augmenter
        .orphans(["User", "Membership"])
        .reference_resolvers(references)
        .augment(&base)
        .expect("federated schema builds")
}

async fn entities(schema: &FederatedSchema, selection: &str, representations: Value) -> async_graphql::Response {
    let query = format!(
        "query($reps: [_Any!]!) {{ _entities(representations: $reps) {{ {selection} }} }}"
    );
    schema
        .schema()
        .execute(Request::new(query).variables(Variables::from_json(json!({ "reps": representations }))))
        .await
}

#[tokio::test]
async fn test_orphans_appear_in_sdl() {
    let calls = Calls::default();
    let federated = federate(&calls, FederationAugmenter::new());

    assert!(federated.sdl().contains("type User"));
    assert!(federated.sdl().contains("type Membership"));
    assert!(federated.sdl().contains("@key(fields: \"id\")"));
    assert_eq!(federated.entities(), ["User".to_string(), "Membership".to_string()]);

    let response = federated.schema().execute("{ _service { sdl } }").await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    let served = response.data.into_json().unwrap();
    assert!(served["_service"]["sdl"].as_str().unwrap().contains("type User"));
}

#[tokio::test]
async fn test_reference_resolver_receives_only_key_fields() {
    let calls = Calls::default();
    let federated = federate(&calls, FederationAugmenter::new());

    let response = entities(
        &federated,
        "... on User { id firstName lastName }",
        json!([{"__typename": "User", "id": "1", "firstName": "stale", "extra": true}]),
    )
    .await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);

    let data = response.data.into_json().unwrap();
    assert_eq!(data["_entities"][0]["firstName"], "Bilbo");
    assert_eq!(data["_entities"][0]["lastName"], "Baggins");
    assert_eq!(*calls.lock().unwrap(), vec![json!({"id": "1"})]);
}

#[tokio::test]
async fn test_nested_key_is_projected() {
    let calls = Calls::default();
    let federated = federate(&calls, FederationAugmenter::new());

    let response = entities(
        &federated,
        "... on Membership { id team { name } }",
        json!([{"__typename": "Membership", "id": "2", "team": {"id": "t2", "name": "ignored"}}]),
    )
    .await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);

    let data = response.data.into_json().unwrap();
    assert_eq!(data["_entities"][0]["team"]["name"], "Misty");
    assert_eq!(*calls.lock().unwrap(), vec![json!({"id": "2", "team": {"id": "t2"}})]);
}

#[tokio::test]
async fn test_unknown_entity_resolves_to_null() {
    let calls = Calls::default();
    let federated = federate(&calls, FederationAugmenter::new());

    let response = entities(
        &federated,
        "... on User { id }",
        json!([{"__typename": "User", "id": "404"}]),
    )
    .await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    assert_eq!(response.data.into_json().unwrap()["_entities"][0], Value::Null);
}

#[tokio::test]
async fn test_missing_entities_keep_their_positions() {
    let calls = Calls::default();
    let federated = federate(&calls, FederationAugmenter::new());

    let query = r#"query($reps: [_Any!]!) {
        found: _entities(representations: $reps) { ... on User { firstName } }
        again: _entities(representations: $reps) { __typename }
    }"#;
    let reps = json!([
        {"__typename": "User", "id": "404"},
        {"__typename": "User", "id": "2"},
        {"__typename": "Membership", "id": "9", "team": {"id": "t9"}},
    ]);
    let response = federated
        .schema()
        .execute(Request::new(query).variables(Variables::from_json(json!({ "reps": reps }))))
        .await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);

    let data = response.data.into_json().unwrap();
    assert_eq!(data["found"], json!([null, {"firstName": "Gollum"}, null]));
    assert_eq!(data["again"], json!([null, {"__typename": "User"}, null]));
}

#[tokio::test]
async fn test_unknown_typename_fails_request_only() {
    let calls = Calls::default();
    let federated = federate(&calls, FederationAugmenter::new());

    let response = entities(
        &federated,
        "... on User { id }",
        json!([{"__typename": "Product", "upc": "1"}]),
    )
    .await;
    assert!(!response.errors.is_empty());
    assert!(calls.lock().unwrap().is_empty());

    let response = federated.schema().execute("{ userCount }").await;
    assert!(response.errors.is_empty());
}

#[tokio::test]
async fn test_caller_directives_are_merged_once() {
    let cache_control = DirectiveDefinition::new("cacheControl")
        .argument(subgraph_graphql::ArgumentDefinition::new("maxAge", FieldType::int().nullable()))
        .on([DirectiveLocation::FieldDefinition, DirectiveLocation::Object]);

    let calls = Calls::default();
    let federated = federate(
        &calls,
        FederationAugmenter::new()
            .directive(cache_control.clone())
            .directive(cache_control),
    );

    assert_eq!(federated.sdl().matches("directive @cacheControl").count(), 1);
    assert!(federated.directives().contains("key"));
    assert!(federated.directives().contains("deprecated"));
    assert_eq!(federated.directives().caller_defined().count(), 1);

    let response = federated.schema().execute("{ _service { sdl } }").await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    let served = response.data.into_json().unwrap();
    assert_eq!(served["_service"]["sdl"], json!(federated.sdl()));
}
