//! Token secrets and the cached credential records built from them.

pub mod record;
pub mod secret;
