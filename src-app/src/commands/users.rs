//! User administration commands
use portal_core::{User, UserFormData};

use super::CommandResult;
use crate::state::AppState;

pub async fn list(state: &AppState) -> CommandResult<Vec<User>> {
    state.app().users().list_users().await.into()
}

pub async fn register(state: &AppState, form: UserFormData) -> CommandResult<User> {
    let request = match form.validate() {
        Ok(request) => request,
        Err(e) => return CommandResult::err(e.to_string()),
    };
    state.app().users().register_user(&request).await.into()
}

pub async fn delete(state: &AppState, user_id: i64) -> CommandResult<i64> {
    state
        .app()
        .users()
        .delete_user(user_id)
        .await
        .map(|_| user_id)
        .into()
}
