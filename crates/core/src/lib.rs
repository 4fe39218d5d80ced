//! Core business logic for failstate.
//!
//! The centre of this crate is [`PenaltyService`], which turns a rejected
//! issue into an escalating enforcement action. [`policy`] holds the
//! service-layer access rules every operation checks before touching data.

pub mod policy;
pub mod services;

pub use policy::{Action, Actor, Table, authorize, authorize_update};
pub use services::*;
