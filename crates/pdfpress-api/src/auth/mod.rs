//! Password gate: shared-password login, signed session cookies, and the middleware
//! protecting the compression route.

pub mod middleware;
pub mod session;

pub use middleware::{session_auth_middleware, AuthFailureLimiter, AuthState};
pub use session::{SessionKeys, SESSION_COOKIE_NAME};
