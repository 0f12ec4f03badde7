// Configuration loading

pub mod error;
pub mod recent;
pub mod settings;
pub mod theme;

pub use error::ConfigError;
pub use recent::RecentFiles;
pub use settings::{EditingSettings, Settings, WindowGeometry};
pub use theme::Theme;
