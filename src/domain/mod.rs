//! Storefront business rules that do not touch the database.
//!
//! Services load rows, hand them to these types, and persist whatever
//! the types report back.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod handoff;
pub mod lifecycle;
pub mod pricing;
