pub mod file;
pub mod text;
pub mod time;

pub use file::{list_files_with_suffix, write_atomically, FileEntry};
pub use text::{quote, sanitize_identifier};
pub use time::{current_human_timestamp, format_file_modified};
