// Library exports for plaza
// The binary and the integration tests drive the client through these modules

pub mod authors;
pub mod command;
pub mod config;
pub mod context;
pub mod error;
pub mod identity;
pub mod media;
pub mod notice;
pub mod service;
pub mod session;
pub mod shell;
pub mod views;
