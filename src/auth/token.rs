use serde::{Deserialize, Serialize};

/// Access token issued at the end of a successful device flow.
///
/// # Example
/// ```
/// use devgrant::auth::AccessToken;
///
/// let token = AccessToken {
///     access_token: "gho_abc".to_string(),
///     token_type: "bearer".to_string(),
///     scope: "read:user,repo".to_string(),
/// };
/// assert_eq!(token.scopes(), vec!["read:user", "repo"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
    pub scope: String,
}

impl AccessToken {
    /// Granted scopes. GitHub separates them with commas, RFC 6749 with spaces.
    pub fn scopes(&self) -> Vec<&str> {
        self.scope
            .split(|c: char| c == ',' || c.is_whitespace())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }
}
