pub mod env;
pub mod server;
pub mod token;
