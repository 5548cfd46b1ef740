//! User administration endpoints

use portal_auth::Roles;
use portal_gateway::Gateway;

use crate::error::UserError;
use crate::user::{User, UserRegistrationRequest};
use crate::Result;

pub struct UserApi {
    gateway: Gateway,
}

impl UserApi {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    /// Roles carried by the current access token
    pub fn roles(&self) -> Roles {
        let session = self.gateway.provider().session();
        Roles::from_token(session.as_ref().map(|s| s.access_token.as_str()))
    }

    // The API enforces the role too; this only avoids a pointless round trip
    fn require_admin(&self) -> Result<()> {
        if self.roles().is_admin() {
            Ok(())
        } else {
            Err(UserError::NotAdmin)
        }
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.require_admin()?;
        let users: Vec<User> = self.gateway.get_json("/users").await?;
        tracing::debug!(count = users.len(), "Loaded users");
        Ok(users)
    }

    pub async fn register_user(&self, request: &UserRegistrationRequest) -> Result<User> {
        self.require_admin()?;
        let user: User = self.gateway.post_json("/users/register", request).await?;
        tracing::info!(user_id = user.id, username = %user.username, "Registered user");
        Ok(user)
    }

    pub async fn delete_user(&self, user_id: i64) -> Result<()> {
        self.require_admin()?;
        self.gateway.delete(&format!("/users/{user_id}")).await?;
        tracing::info!(user_id, "Deleted user");
        Ok(())
    }
}

impl Clone for UserApi {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
        }
    }
}
