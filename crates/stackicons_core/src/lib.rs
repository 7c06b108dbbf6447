pub mod config;
pub mod fallback;
pub mod matcher;
pub mod model;
pub mod repair;
pub mod sanity;
pub mod store;
