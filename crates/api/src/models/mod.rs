//! Domain models for the API.
//!
//! These types are what repositories return; route handlers turn them into
//! response bodies.

pub mod order;
pub mod product;
pub mod user;

pub use order::Order;
pub use product::{NewProduct, Product, ProductChanges, ProductView};
pub use user::User;
