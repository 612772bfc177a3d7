pub mod auth;
pub mod cart;
pub mod offers;
pub mod orders;
pub mod products;
pub mod tracking;
