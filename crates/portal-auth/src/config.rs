//! OIDC client configuration

use serde::{Deserialize, Serialize};
use url::Url;

use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OidcConfig {
    /// Realm issuer, e.g. `http://localhost:8080/realms/pkce-demo`
    pub authority: Url,
    pub client_id: String,
    /// Where the provider sends the browser after sign-in
    pub redirect_uri: Url,
    pub post_logout_redirect_uri: Url,
    /// Space separated scopes
    pub scope: String,
}

impl OidcConfig {
    pub fn authorization_endpoint(&self) -> Result<Url> {
        self.endpoint("auth")
    }

    pub fn token_endpoint(&self) -> Result<Url> {
        self.endpoint("token")
    }

    pub fn end_session_endpoint(&self) -> Result<Url> {
        self.endpoint("logout")
    }

    // Keycloak layout: {issuer}/protocol/openid-connect/{name}
    fn endpoint(&self, name: &str) -> Result<Url> {
        let base = self.authority.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!(
            "{base}/protocol/openid-connect/{name}"
        ))?)
    }
}

impl Default for OidcConfig {
    fn default() -> Self {
        Self {
            authority: Url::parse("http://localhost:8080/realms/pkce-demo")
                .expect("static authority URL"),
            client_id: "my-react-app".to_string(),
            redirect_uri: Url::parse("http://localhost:5678/dashboard")
                .expect("static redirect URL"),
            post_logout_redirect_uri: Url::parse("http://localhost:5678/logout")
                .expect("static logout URL"),
            scope: "openid profile email offline_access".to_string(),
        }
    }
}
