pub mod config_directory;

pub use config_directory::ConfigDirectory;
