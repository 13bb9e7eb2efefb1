//! PDF serialization.
//!
//! [`ObjectSerializer`] writes single objects; [`PdfWriter`] assembles
//! them into a file with a classic cross-reference table.

mod object_serializer;
mod pdf_writer;

pub use object_serializer::ObjectSerializer;
pub use pdf_writer::{compress_data, PdfWriter};
