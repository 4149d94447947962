pub mod auth;
pub mod establishment;

pub use auth::{auth_middleware, client_ip, CurrentUser};
pub use establishment::{require_admin, require_establishment};
