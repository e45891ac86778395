use serde::{Deserialize, Serialize};

/// Account details returned by the current-user endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct UserProfile {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub lastname: Option<String>,
    pub email: String,
}

impl UserProfile {
    pub fn display_name(&self) -> String {
        match self.lastname.as_deref() {
            Some(last) if !last.is_empty() => format!("{} {}", self.name, last),
            _ => self.name.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserEnvelope {
    pub user: UserProfile,
}

/// Sign-up form fields.
#[derive(Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct RegisterData {
    pub name: String,
    pub lastname: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for RegisterData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterData")
            .field("name", &self.name)
            .field("lastname", &self.lastname)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name() {
        let mut user = UserProfile {
            id: 1,
            name: "Ana".to_string(),
            lastname: Some("Ruiz".to_string()),
            email: "ana@example.com".to_string(),
        };
        assert_eq!(user.display_name(), "Ana Ruiz");
        user.lastname = None;
        assert_eq!(user.display_name(), "Ana");
    }

    #[test]
    fn test_register_debug_hides_password() {
        let data = RegisterData {
            name: "Ana".to_string(),
            lastname: "Ruiz".to_string(),
            email: "ana@example.com".to_string(),
            password: "hunter2".to_string(),
        };
        assert!(!format!("{:?}", data).contains("hunter2"));
    }
}
