// Library for tests to access modules

pub mod balancer;
pub mod cluster_source;
pub mod config;
pub mod kv_store;
pub mod log_store;
pub mod models;
pub mod persister;
pub mod routes;
pub mod version;
pub mod watcher;
