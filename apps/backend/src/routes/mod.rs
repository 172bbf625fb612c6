pub mod auth;
pub mod exercises;
pub mod history;
