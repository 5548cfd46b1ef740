use portal_core::Dashboard;

use super::CommandResult;
use crate::state::AppState;

pub async fn show(state: &AppState) -> CommandResult<Dashboard> {
    state.app().dashboard().await.into()
}
