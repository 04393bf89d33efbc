// Library exports for hallpass
// This allows integration tests and external code to use hallpass modules

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod relay;
pub mod routes;
pub mod site_mode;
pub mod state;
