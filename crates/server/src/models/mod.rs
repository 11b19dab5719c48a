//! Domain models for products, carts and orders.

pub mod cart;
pub mod order;
pub mod product;

pub use cart::{Cart, CartLine, NewCartLine};
pub use order::{NewOrder, NewOrderLine, Order, OrderLine};
pub use product::{NewProduct, Product};
