//! Authentication primitives: password hashing and signed bearer tokens

pub mod password;
pub mod token;

pub use password::PasswordHasher;
pub use token::{Claims, TokenError, TokenService};
