//! Chat dispatch for DocChat.
//!
//! Classifies each incoming message, evaluates arithmetic locally and sends
//! everything else to conversational retrieval over the session's document.
//! Per-session history lives in [`SessionStore`].

pub mod classify;
pub mod dispatcher;
pub mod error;
pub mod session;

pub use classify::{classify, MessageKind, CALCULATE_KEYWORD};
pub use dispatcher::{ChatDispatcher, ChatReply, EMPTY_EXPRESSION_PROMPT};
pub use error::ChatError;
pub use session::{SessionGuard, SessionStore, SESSION_ID_LEN};
