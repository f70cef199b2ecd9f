pub mod app;
pub mod cli;
pub mod config;
pub mod logging;
pub mod preview;
pub mod state;
pub mod theme;
pub mod widgets;

pub use app::ToJpegApp;
pub use cli::Args;
pub use config::AppConfig;
