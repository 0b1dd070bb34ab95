pub mod config;
pub mod error;
pub mod event;
pub mod extract;
pub mod factory;
pub mod http_client;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod provider;
pub mod providers;
pub mod sanitize;
pub mod stream;
