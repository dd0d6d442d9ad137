/// Web API Handlers
///
/// This module contains the handlers for the RESTful API endpoints: the
/// generic CRUD handlers, parameterized over any entity collection, and the
/// account handlers specialized for the authenticated user.

mod account_handlers;
mod crud_handlers;

// Re-export all handlers
pub use account_handlers::*;
pub use crud_handlers::*;
