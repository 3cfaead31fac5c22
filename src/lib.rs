pub mod app;
pub mod config;
pub mod docker_compose;
pub mod error;
pub mod logging;
pub mod presenters;
pub mod services;
pub mod settings;
