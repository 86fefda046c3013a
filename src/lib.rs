pub mod animal;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod environment;
pub mod errors;
pub mod feed;
pub mod routes;
pub mod urls;
