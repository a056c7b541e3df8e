//! Client-session authentication for HTTP handlers.

mod extractor;

pub use extractor::{AdminSession, AuthError, ClientSession};
