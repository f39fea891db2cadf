pub mod provider;
pub mod user;

pub use provider::*;
pub use user::*;
