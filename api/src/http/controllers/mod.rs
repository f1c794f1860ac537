pub mod chat;
pub mod documents;

pub use chat as ChatController;
pub use documents as DocumentController;
