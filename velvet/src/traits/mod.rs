mod atomic;
mod auth;
mod document;
mod store;

pub use atomic::*;
pub use auth::*;
pub use document::*;
pub use store::*;
