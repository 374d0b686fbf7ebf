pub mod dispatcher;
pub mod log_provider;
pub mod webhook_provider;
