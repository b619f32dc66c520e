pub mod attachments;
pub mod auth;
pub mod chat;
pub mod contacts;
pub mod error;
pub mod favorites;
pub mod middleware;
pub mod notifications;
pub mod realtime;
