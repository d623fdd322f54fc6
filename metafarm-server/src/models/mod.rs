//! Wire types for the external chat-completion API.
//!
//! These are outbound DTOs only; the server's own request/response bodies
//! live in [`crate::schemas`].

pub mod openai;
