//! Auth-domain models: hosts, scopes, token secrets, and credential records.

pub mod host;
pub mod scope;
pub mod token;

pub use host::*;
pub use scope::*;
pub use token::{record::*, secret::*};
