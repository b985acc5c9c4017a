//! Types shared by the stream status relay crates

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
