pub mod push;
pub mod store;
pub mod time;

pub use push::PushGateway;
pub use store::KeyValueStore;
pub use time::TimeProvider;
