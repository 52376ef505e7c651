pub mod coap_client;
pub mod config;
pub mod defaults;
pub mod error;
pub mod health;
pub mod server_conf;

pub use config::ConfigFromEnv;
pub use error::{ErrorResponse, GatewayError};
pub use server_conf::{ServerConf, ServerConfStore};
