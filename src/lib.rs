pub mod app;
pub mod audio;
pub mod config;
pub mod core;
pub mod cover;
pub mod logging;
pub mod model;
pub mod presence;
pub mod transport;
pub mod ui;
