//! Utility functions and types

pub mod data_loader;

pub use data_loader::{file_name, list_csv_files, list_files, move_file, DataLoader, DataSaver};
