//! XMP metadata for PDF/A identification.
//!
//! [`XmpPacket`] writes the packet a conforming file carries in its catalog
//! /Metadata stream; [`parse_identification`] reads the `pdfaid` values back
//! from any packet, whether they are written as elements or as attributes
//! of `rdf:Description`.

use crate::compliance::PdfALevel;
use crate::error::Result;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

const NS_X: &str = "adobe:ns:meta/";
const NS_RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
const NS_DC: &str = "http://purl.org/dc/elements/1.1/";
const NS_XMP: &str = "http://ns.adobe.com/xap/1.0/";
const NS_PDF: &str = "http://ns.adobe.com/pdf/1.3/";
const NS_PDFAID: &str = "http://www.aiim.org/pdfa/ns/id/";

/// Revision year written for part 4.
pub const PDFA4_REVISION: &str = "2020";

/// The `pdfaid` values of a packet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PdfAIdentification {
    /// pdfaid:part
    pub part: Option<String>,
    /// pdfaid:conformance
    pub conformance: Option<String>,
    /// pdfaid:rev
    pub rev: Option<String>,
}

impl PdfAIdentification {
    /// The level these values name, if they name one.
    pub fn level(&self) -> Option<PdfALevel> {
        PdfALevel::from_xmp(self.part.as_deref()?, self.conformance.as_deref())
    }
}

/// Builder for a PDF/A XMP packet.
#[derive(Debug, Clone)]
pub struct XmpPacket {
    level: PdfALevel,
    title: Option<String>,
    producer: Option<String>,
    create_date: Option<String>,
    modify_date: Option<String>,
}

impl XmpPacket {
    /// Start a packet identifying `level`.
    pub fn new(level: PdfALevel) -> Self {
        Self {
            level,
            title: None,
            producer: None,
            create_date: None,
            modify_date: None,
        }
    }

    /// Set dc:title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set pdf:Producer.
    pub fn producer(mut self, producer: impl Into<String>) -> Self {
        self.producer = Some(producer.into());
        self
    }

    /// Set xmp:CreateDate (ISO 8601).
    pub fn create_date(mut self, date: impl Into<String>) -> Self {
        self.create_date = Some(date.into());
        self
    }

    /// Set xmp:ModifyDate (ISO 8601).
    pub fn modify_date(mut self, date: impl Into<String>) -> Self {
        self.modify_date = Some(date.into());
        self
    }

    /// Build the packet as bytes.
    pub fn build_bytes(&self) -> Vec<u8> {
        self.to_xml().into_bytes()
    }

    fn to_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str("<?xpacket begin=\"\u{feff}\" id=\"W5M0MpCehiHzreSzNTczkc9d\"?>\n");
        xml.push_str(&format!("<x:xmpmeta xmlns:x=\"{}\">\n", NS_X));
        xml.push_str(&format!("  <rdf:RDF xmlns:rdf=\"{}\">\n", NS_RDF));
        xml.push_str("    <rdf:Description rdf:about=\"\"\n");
        xml.push_str(&format!("        xmlns:dc=\"{}\"\n", NS_DC));
        xml.push_str(&format!("        xmlns:xmp=\"{}\"\n", NS_XMP));
        xml.push_str(&format!("        xmlns:pdf=\"{}\"\n", NS_PDF));
        xml.push_str(&format!("        xmlns:pdfaid=\"{}\">\n", NS_PDFAID));

        xml.push_str(&format!("      <pdfaid:part>{}</pdfaid:part>\n", self.level.xmp_part()));
        if let Some(conformance) = self.level.xmp_conformance() {
            xml.push_str(&format!("      <pdfaid:conformance>{}</pdfaid:conformance>\n", conformance));
        }
        if self.level.xmp_part() == "4" {
            xml.push_str(&format!("      <pdfaid:rev>{}</pdfaid:rev>\n", PDFA4_REVISION));
        }

        if let Some(title) = &self.title {
            xml.push_str("      <dc:title>\n        <rdf:Alt>\n");
            xml.push_str(&format!(
                "          <rdf:li xml:lang=\"x-default\">{}</rdf:li>\n",
                escape_xml(title)
            ));
            xml.push_str("        </rdf:Alt>\n      </dc:title>\n");
        }
        if let Some(date) = &self.create_date {
            xml.push_str(&format!("      <xmp:CreateDate>{}</xmp:CreateDate>\n", escape_xml(date)));
        }
        if let Some(date) = &self.modify_date {
            xml.push_str(&format!("      <xmp:ModifyDate>{}</xmp:ModifyDate>\n", escape_xml(date)));
        }
        if let Some(producer) = &self.producer {
            xml.push_str(&format!("      <pdf:Producer>{}</pdf:Producer>\n", escape_xml(producer)));
        }

        xml.push_str("    </rdf:Description>\n");
        xml.push_str("  </rdf:RDF>\n");
        xml.push_str("</x:xmpmeta>\n");
        // Padding lets the packet be edited in place
        for _ in 0..20 {
            xml.push_str("                                                  \n");
        }
        xml.push_str("<?xpacket end=\"w\"?>");
        xml
    }
}

/// Read the `pdfaid` values of a packet.
pub fn parse_identification(xml: &[u8]) -> Result<PdfAIdentification> {
    let text = String::from_utf8_lossy(xml);
    let mut reader = Reader::from_str(&text);
    reader.trim_text(true);

    let mut id = PdfAIdentification::default();
    let mut current: Option<String> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                read_attributes(&e, &mut id)?;
                current = Some(String::from_utf8_lossy(e.name().as_ref()).into_owned());
            },
            Event::Empty(e) => read_attributes(&e, &mut id)?,
            Event::Text(e) => {
                let value = e.unescape()?.trim().to_string();
                if let Some(element) = current.as_deref() {
                    assign(&mut id, element, value);
                }
            },
            Event::End(_) => current = None,
            Event::Eof => break,
            _ => {},
        }
    }
    Ok(id)
}

fn read_attributes(element: &BytesStart<'_>, id: &mut PdfAIdentification) -> Result<()> {
    for attr in element.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        if key.starts_with("pdfaid:") {
            let value = attr.unescape_value()?.trim().to_string();
            assign(id, &key, value);
        }
    }
    Ok(())
}

fn assign(id: &mut PdfAIdentification, key: &str, value: String) {
    match key {
        "pdfaid:part" => id.part = Some(value),
        "pdfaid:conformance" => id.conformance = Some(value),
        "pdfaid:rev" => id.rev = Some(value),
        _ => {},
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Current time in ISO 8601, as XMP dates are written.
pub fn iso_timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}
