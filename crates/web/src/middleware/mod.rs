//! HTTP middleware and extractors.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request span)
//! 3. Request ID
//! 4. Session layer (tower-sessions with `PostgreSQL` store)
//!
//! # Extractors
//!
//! - [`RequireAuth`] / [`OptionalAuth`] - the logged-in user
//! - [`Page`] - user plus pending flash messages, for rendered pages

pub mod auth;
pub mod flash;
pub mod page;
pub mod request_id;
pub mod session;

pub use auth::{OptionalAuth, RequireAuth, clear_current_user, set_current_user};
pub use flash::{
    FlashKind, FlashLink, FlashMessage, push_flash, push_flash_with_link, push_flashes,
    take_flashes,
};
pub use page::Page;
pub use request_id::request_id_middleware;
pub use session::{create_session_layer, session_layer};
