pub mod pet;
pub mod tag;
pub mod user;
