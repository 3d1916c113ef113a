pub mod api_client;

pub use api_client::{build_multipart, first_error_message, ApiClient, Attachment, Download};
