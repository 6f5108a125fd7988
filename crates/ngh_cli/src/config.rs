//! Credentials and identity loaded from environment variables.

use ngh_sync_engine::{Author, EngineConfig, SyncError, GITHUB_API_URL};

/// Variable holding the GitHub user name.
pub const USER_VAR: &str = "NGH_GITHUB_USER";
/// Variable holding the password or personal access token.
pub const TOKEN_VAR: &str = "NGH_GITHUB_TOKEN";
/// Variable holding the commit author name.
pub const AUTHOR_NAME_VAR: &str = "NGH_AUTHOR_NAME";
/// Variable holding the commit author email.
pub const AUTHOR_EMAIL_VAR: &str = "NGH_AUTHOR_EMAIL";
/// Variable overriding the API endpoint.
pub const API_URL_VAR: &str = "NGH_API_URL";

/// Who talks to the provider, and as whom commits are made.
#[derive(Debug, Clone)]
pub struct Identity {
    /// GitHub user name.
    pub user: String,
    /// Password or token.
    pub token: String,
    /// Commit author, if both name and email are set.
    pub author: Option<Author>,
    /// API endpoint.
    pub api_url: String,
}

impl Identity {
    /// Loads the identity from the process environment.
    pub fn from_env() -> Result<Self, SyncError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads the identity through `lookup`. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SyncError> {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let user = get(USER_VAR)
            .ok_or_else(|| SyncError::Configuration(format!("{USER_VAR} is not set")))?;
        let token = get(TOKEN_VAR)
            .ok_or_else(|| SyncError::Configuration(format!("{TOKEN_VAR} is not set")))?;

        let author = match (get(AUTHOR_NAME_VAR), get(AUTHOR_EMAIL_VAR)) {
            (Some(name), Some(email)) => Some(Author::new(name, email)),
            _ => None,
        };

        let api_url = get(API_URL_VAR)
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| GITHUB_API_URL.to_string());

        Ok(Self {
            user,
            token,
            author,
            api_url,
        })
    }

    /// Completes `name` to `owner/name`, the owner defaulting to our user.
    pub fn full_repository_name(&self, name: &str) -> String {
        if name.contains('/') {
            name.to_string()
        } else {
            format!("{}/{name}", self.user)
        }
    }

    /// Engine configuration carrying our author.
    pub fn engine_config(&self) -> EngineConfig {
        match &self.author {
            Some(author) => EngineConfig::new().with_author(author.clone()),
            None => EngineConfig::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn loads_full_identity() {
        let identity = Identity::from_lookup(lookup(&[
            (USER_VAR, "konamiman"),
            (TOKEN_VAR, "secret"),
            (AUTHOR_NAME_VAR, "Nestor"),
            (AUTHOR_EMAIL_VAR, "nestor@example.com"),
            (API_URL_VAR, "https://ghe.example.com/api/v3/"),
        ]))
        .unwrap();

        assert_eq!(identity.user, "konamiman");
        assert_eq!(identity.api_url, "https://ghe.example.com/api/v3");
        assert_eq!(
            identity.author,
            Some(Author::new("Nestor", "nestor@example.com"))
        );
        assert!(identity.engine_config().author.is_some());
    }

    #[test]
    fn missing_token_is_a_configuration_error() {
        let err = Identity::from_lookup(lookup(&[(USER_VAR, "konamiman"), (TOKEN_VAR, " ")]))
            .unwrap_err();
        assert!(matches!(err, SyncError::Configuration(ref m) if m.contains(TOKEN_VAR)));
    }

    #[test]
    fn defaults() {
        let identity =
            Identity::from_lookup(lookup(&[(USER_VAR, "me"), (TOKEN_VAR, "t")])).unwrap();
        assert_eq!(identity.api_url, GITHUB_API_URL);
        assert!(identity.author.is_none());
        assert_eq!(identity.full_repository_name("demo"), "me/demo");
        assert_eq!(identity.full_repository_name("octo/demo"), "octo/demo");
    }
}
