pub mod snug;

pub use snug::{Credentials, SnugClient, SnugError};
