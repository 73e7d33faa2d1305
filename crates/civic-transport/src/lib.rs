pub mod config;
pub mod http;
pub mod portal;
pub mod push;

pub use config::ClientConfig;
pub use http::HttpApi;
pub use portal::Portal;
pub use push::PushSocket;
