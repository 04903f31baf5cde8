//! In-memory users backing the sample function.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl User {
    fn new(id: &str, first_name: &str, last_name: &str) -> Self {
        Self {
            id: id.to_string(),
            first_name: Some(first_name.to_string()),
            last_name: Some(last_name.to_string()),
        }
    }
}

pub fn mock_users() -> Vec<User> {
    vec![
        User::new("123", "Bilbo", "Baggins"),
        User::new("456", "Gollum", "Precious"),
        User::new("789", "Lord", "Sauron"),
    ]
}

pub fn find_user_by_id(id: &str) -> Option<User> {
    mock_users().into_iter().find(|user| user.id == id)
}
