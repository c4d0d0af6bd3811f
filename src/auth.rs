//! Identity model, signing keys, and signed-credential verification.

pub mod id;
pub mod identity;
pub mod token;

pub use id::*;
pub use identity::*;
pub use token::{claims::*, key::*, *};
