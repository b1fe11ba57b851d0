//! Service helpers: token issuing, password hashing, image storage.

pub mod passwords;
pub mod tokens;
pub mod uploads;

pub use tokens::{Claims, TokenService};
pub use uploads::ImageStore;
