mod app;
mod effects;
pub mod logging;
mod render;
pub mod settings;

pub use app::run_app;
