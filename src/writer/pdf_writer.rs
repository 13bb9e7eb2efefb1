//! PDF file writer.
//!
//! Writes a classic PDF file: header, body, xref table, and trailer.
//! Objects can be written as soon as they are final (flushed) and the rest
//! at the end; the xref table is assembled from the recorded offsets.

use super::object_serializer::ObjectSerializer;
use crate::compliance::types::PdfVersion;
use crate::error::Result;
use crate::object::{Dictionary, Object, ObjectRef};
use std::collections::BTreeMap;
use std::io::Write;

/// Compress data using Flate/Deflate compression.
///
/// Returns compressed bytes suitable for FlateDecode filter.
pub fn compress_data(data: &[u8]) -> std::io::Result<Vec<u8>> {
    use flate2::write::ZlibEncoder;
    use flate2::Compression;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Incremental PDF file writer.
///
/// The header is written on creation. Each object is written once; a
/// second write of the same number is ignored.
#[derive(Debug)]
pub struct PdfWriter {
    serializer: ObjectSerializer,
    output: Vec<u8>,
    /// Object number -> (byte offset, generation)
    offsets: BTreeMap<u32, (usize, u16)>,
}

impl PdfWriter {
    /// Start a file with the given header version.
    pub fn new(version: PdfVersion) -> Result<Self> {
        let mut output = Vec::new();
        writeln!(output, "%PDF-{}", version)?;
        // Binary marker (recommended for binary content)
        output.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");
        Ok(Self {
            serializer: ObjectSerializer::compact(),
            output,
            offsets: BTreeMap::new(),
        })
    }

    /// Whether an object has been written.
    pub fn is_written(&self, reference: ObjectRef) -> bool {
        self.offsets.contains_key(&reference.id)
    }

    /// Number of objects written so far.
    pub fn written_count(&self) -> usize {
        self.offsets.len()
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.output.len()
    }

    /// Returns true if nothing but the header has been written.
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Write an indirect object. Returns false if it was already written.
    pub fn write_object(&mut self, reference: ObjectRef, object: &Object) -> bool {
        if self.is_written(reference) {
            return false;
        }
        self.offsets.insert(reference.id, (self.output.len(), reference.gen));
        let bytes = self.serializer.serialize_indirect(reference.id, reference.gen, object);
        self.output.extend_from_slice(&bytes);
        true
    }

    /// Write the xref table and trailer and return the file.
    ///
    /// `size` is one more than the highest object number in use; numbers
    /// below it that were never written are listed as free.
    pub fn finish(mut self, trailer: &Dictionary, size: u32) -> Result<Vec<u8>> {
        let size = size.max(self.offsets.keys().next_back().map_or(1, |id| id + 1));
        let xref_offset = self.output.len();

        writeln!(self.output, "xref")?;
        writeln!(self.output, "0 {}", size)?;
        writeln!(self.output, "0000000000 65535 f ")?;
        for id in 1..size {
            match self.offsets.get(&id) {
                Some((offset, gen)) => writeln!(self.output, "{:010} {:05} n ", offset, gen)?,
                None => writeln!(self.output, "0000000000 00000 f ")?,
            }
        }

        let mut trailer = trailer.clone();
        trailer.insert("Size".to_string(), Object::Integer(size as i64));
        writeln!(self.output, "trailer")?;
        self.serializer.write_object(&mut self.output, &Object::Dictionary(trailer));
        writeln!(self.output)?;
        writeln!(self.output, "startxref")?;
        writeln!(self.output, "{}", xref_offset)?;
        write!(self.output, "%%EOF")?;

        Ok(self.output)
    }
}
