//! Client for the property-management backend: session handling, typed
//! API access, form staging for property and rental creation, and the
//! payment view model behind the dashboard and accounting pages.

pub mod config;
pub mod error;
pub mod forms;
pub mod repository;
pub mod routes;
pub mod schemas;
pub mod services;
pub mod session;

pub use config::ClientConfig;
pub use error::{AppError, AppResult, FieldErrors};
pub use repository::ApiClient;
pub use session::Session;
