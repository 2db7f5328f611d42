//! # API Module
//!
//! Business logic of the application, independent from the html layer.
//! Every operation receives the store (and the auth provider when needed)
//! explicitly and returns an [errors::ActionError] the pages can render.
//!
//! ## Modules
//!
//! - [`admin`] - Staff statistics, user verification and NFC marking
//! - [`errors`] - Action error taxonomy and the result envelope
//! - [`integrity`] - Detection and repair of inconsistent activations
//! - [`pet`] - Owner dashboard and pet removal
//! - [`tag`] - Tag lookup, claim state machine and claim commit
//! - [`user`] - Sign in, sign up and sign out
//! - [`validation`] - Pure form checks

pub mod admin;
pub mod errors;
pub mod integrity;
pub mod pet;
pub mod tag;
pub mod user;
pub mod validation;
