// HTTP Server modules
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod service;

// Chat document store
pub mod store;

// Event fan-out and delayed system replies
pub mod auto_reply;
pub mod realtime;
