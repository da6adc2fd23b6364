use serde::{Deserialize, Serialize};

/// Профиль пользователя, который бэкенд возвращает вместе с токеном.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

impl UserProfile {
    // Если бэкенд не прислал профиль - собираем его из email
    pub fn from_email(email: &str) -> Self {
        let name = email.split('@').next().unwrap_or(email).to_string();
        Self {
            name: Some(name),
            email: Some(email.to_string()),
            picture: None,
        }
    }
}
