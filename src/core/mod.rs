//! Core types shared by every layer: the error taxonomy and its user-facing
//! rendering.

pub mod error;

pub use error::{ErrorContext, QuickstartError, create_error_context, user_friendly_error};
