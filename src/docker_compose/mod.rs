pub mod compose_cli;
#[allow(clippy::module_inception)]
pub mod docker_compose;
