//! ICC profiles: header fields and content identity.

use byteorder::{BigEndian, ByteOrder};
use bytes::Bytes;
use sha2::{Digest, Sha256};

use super::ColorSpaceFamily;

/// Length of the fixed ICC header.
pub const ICC_HEADER_LEN: usize = 128;

/// Fields of the 128-byte ICC header that the checks need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IccHeader {
    /// Declared profile size
    pub size: u32,
    /// Major version
    pub major_version: u8,
    /// Minor version
    pub minor_version: u8,
    /// Device class signature: "mntr", "prtr", "scnr", "spac", ...
    pub device_class: String,
    /// Data color space signature: "GRAY", "RGB ", "CMYK", "Lab ", ...
    pub color_space: String,
}

impl IccHeader {
    /// Parse the header, `None` if the data is too short or lacks the
    /// "acsp" file signature.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < ICC_HEADER_LEN || &data[36..40] != b"acsp" {
            return None;
        }
        Some(Self {
            size: BigEndian::read_u32(&data[0..4]),
            major_version: data[8],
            minor_version: data[9] >> 4,
            device_class: read_signature(&data[12..16]),
            color_space: read_signature(&data[16..20]),
        })
    }

    /// Number of components implied by the data color space.
    pub fn components(&self) -> Option<u8> {
        match self.color_space.trim_end() {
            "GRAY" => Some(1),
            "RGB" | "Lab" | "XYZ" | "YCbr" | "Luv" | "Yxy" | "HSV" | "HLS" | "CMY" => Some(3),
            "CMYK" => Some(4),
            _ => None,
        }
    }

    /// Version as "major.minor".
    pub fn version(&self) -> String {
        format!("{}.{}", self.major_version, self.minor_version)
    }
}

fn read_signature(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| if b.is_ascii_graphic() || *b == b' ' { *b as char } else { '?' })
        .collect()
}

/// An embedded ICC profile with its component count and content digest.
#[derive(Debug, Clone)]
pub struct IccProfile {
    data: Bytes,
    components: u8,
    digest: [u8; 32],
}

impl IccProfile {
    /// Wrap profile bytes declared with `components` (/N).
    pub fn new(data: impl Into<Bytes>, components: u8) -> Self {
        let data = data.into();
        let digest = Sha256::digest(&data).into();
        Self {
            data,
            components,
            digest,
        }
    }

    /// Wrap profile bytes, taking /N from the header.
    pub fn from_bytes(data: impl Into<Bytes>) -> Option<Self> {
        let data = data.into();
        let components = IccHeader::parse(&data)?.components()?;
        Some(Self::new(data, components))
    }

    /// Profile bytes.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Declared component count.
    pub fn components(&self) -> u8 {
        self.components
    }

    /// Parsed header, if valid.
    pub fn header(&self) -> Option<IccHeader> {
        IccHeader::parse(&self.data)
    }

    /// Device family of the profile's data color space.
    pub fn family(&self) -> Option<ColorSpaceFamily> {
        match self.header()?.color_space.trim_end() {
            "GRAY" => Some(ColorSpaceFamily::Gray),
            "RGB" => Some(ColorSpaceFamily::Rgb),
            "CMYK" => Some(ColorSpaceFamily::Cmyk),
            _ => None,
        }
    }

    /// Byte-for-byte identity, digest compared first.
    pub fn same_content(&self, other: &IccProfile) -> bool {
        self.digest == other.digest && self.data == other.data
    }
}

impl PartialEq for IccProfile {
    fn eq(&self, other: &Self) -> bool {
        self.components == other.components && self.same_content(other)
    }
}

/// Build a minimal, header-only profile. Used to exercise the checks
/// without shipping real characterization data.
pub fn synthetic_profile(color_space: &[u8; 4], device_class: &[u8; 4], major_version: u8) -> Vec<u8> {
    let mut data = vec![0u8; ICC_HEADER_LEN];
    BigEndian::write_u32(&mut data[0..4], ICC_HEADER_LEN as u32);
    data[8] = major_version;
    data[9] = 0x10;
    data[12..16].copy_from_slice(device_class);
    data[16..20].copy_from_slice(color_space);
    data[20..24].copy_from_slice(b"XYZ ");
    data[36..40].copy_from_slice(b"acsp");
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header() {
        let data = synthetic_profile(b"RGB ", b"mntr", 2);
        let header = IccHeader::parse(&data).unwrap();
        assert_eq!(header.major_version, 2);
        assert_eq!(header.minor_version, 1);
        assert_eq!(header.version(), "2.1");
        assert_eq!(header.device_class, "mntr");
        assert_eq!(header.components(), Some(3));
    }

    #[test]
    fn test_reject_short_or_unsigned_data() {
        assert!(IccHeader::parse(&[0u8; 64]).is_none());
        assert!(IccHeader::parse(&[0u8; 128]).is_none());
    }

    #[test]
    fn test_family_from_header() {
        let cmyk = IccProfile::from_bytes(synthetic_profile(b"CMYK", b"prtr", 4)).unwrap();
        assert_eq!(cmyk.components(), 4);
        assert_eq!(cmyk.family(), Some(ColorSpaceFamily::Cmyk));
        let lab = IccProfile::from_bytes(synthetic_profile(b"Lab ", b"spac", 4)).unwrap();
        assert_eq!(lab.family(), None);
    }

    #[test]
    fn test_content_identity() {
        let a = IccProfile::new(synthetic_profile(b"RGB ", b"mntr", 2), 3);
        let b = IccProfile::new(synthetic_profile(b"RGB ", b"mntr", 2), 3);
        let c = IccProfile::new(synthetic_profile(b"RGB ", b"mntr", 4), 3);
        assert!(a.same_content(&b));
        assert!(!a.same_content(&c));
        assert_eq!(a, b);
    }
}
