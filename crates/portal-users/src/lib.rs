//! Portal User Administration
//!
//! Admin-only account management over the authorized gateway:
//! list, register and delete application users.

mod api;
mod error;
mod user;

pub use api::UserApi;
pub use error::UserError;
pub use user::{Role, User, UserFormData, UserRegistrationRequest};

pub type Result<T> = std::result::Result<T, UserError>;
