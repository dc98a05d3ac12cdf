mod atomic_io;
mod json;

pub use atomic_io::{write_bytes_atomic, write_text_atomic};
pub use json::{
    expected_actual, parse_json_document, read_json_document, validation_err, JsonDocumentError,
};
