/// Logs at `info` when `$dev` is set, `debug` otherwise
macro_rules! dev_log {
    ($dev:expr, $($arg:tt)+) => {
        if $dev {
            tracing::info!($($arg)+)
        } else {
            tracing::debug!($($arg)+)
        }
    };
}

pub mod config;
pub mod detector;
pub mod docs;
pub mod domain;
pub mod interceptor;
pub mod invalidator;
pub mod rules;
pub mod scheduler;
pub mod setup;
pub mod store;

pub use setup::{CacheInvalidation, SetupError};
