//! Library exports for the `dsforge` binary, benchmarks, and tests.
/// Application root and log directory resolution.
pub mod app_dirs;
/// Metadata views for exploring a store.
pub mod catalog;
/// Dataset-creation configuration files.
pub mod config;
/// Dataset assembly pipeline and its building blocks.
pub mod dataset;
/// Prompting for answers the configuration leaves open.
pub mod interaction;
/// Per-plugin scratch cache directories.
pub mod local_cache;
/// Logging setup shared by the binary.
pub mod logging;
/// Built-in dataset plugins.
pub mod plugins;
/// Imageset and dataset storage.
pub mod store;
