mod atomic;

pub use atomic::{file_key, read_json, write_json_atomic, write_json_new};
