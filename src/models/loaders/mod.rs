pub mod json_loader;

pub use json_loader::{
    ensure_dir, list_json_files, read_json, read_json_if_exists, remove_file_if_exists,
    write_json_atomically,
};
