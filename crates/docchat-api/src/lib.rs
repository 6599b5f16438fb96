//! docchat API crate: axum HTTP server and route handlers.
//!
//! Exposes `POST /upload_pdf` to index a document and open a session, and
//! `POST /chat` to ask questions or evaluate arithmetic within a session.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
