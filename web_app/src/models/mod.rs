pub mod admin;
pub mod pet;
pub mod tag;
pub mod user_app;
