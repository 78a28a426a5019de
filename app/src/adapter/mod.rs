pub mod esp32;
pub mod http_api;
pub mod webhook;
