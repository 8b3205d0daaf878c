pub mod auth;
pub mod chat;
pub mod logs;
pub mod pdf;
pub mod products;
pub mod proxy;
pub mod query;
