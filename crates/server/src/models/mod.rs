//! Domain models shared between the db layer and route handlers.

pub mod cart;
pub mod order;
pub mod pagination;
pub mod product;
pub mod review;
pub mod user;

pub use cart::{Cart, CartLine};
pub use order::{Order, OrderItem, OrderPatch, authorize_patch, check_transition};
pub use pagination::{PageOptions, SortOrder};
pub use product::{Product, ProductFilters, ProductSort};
pub use review::Review;
pub use user::User;
