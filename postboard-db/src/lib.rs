pub mod client;
pub mod memory;
pub(crate) mod record;
pub mod store;
