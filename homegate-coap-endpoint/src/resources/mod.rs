pub mod configs;
pub mod devices;
pub mod info;
pub mod services;
