pub mod normalize;
pub mod record;
pub mod server;
pub mod store;
