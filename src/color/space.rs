//! Color spaces as they appear in resources, images and operators.

use super::icc::IccProfile;
use crate::error::{Error, Result};
use crate::object::{Dictionary, Object};
use crate::store::ObjectStore;
use std::fmt;

/// Device color family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSpaceFamily {
    /// DeviceGray
    Gray,
    /// DeviceRGB
    Rgb,
    /// DeviceCMYK
    Cmyk,
}

impl ColorSpaceFamily {
    /// Device color space name.
    pub fn device_name(&self) -> &'static str {
        match self {
            ColorSpaceFamily::Gray => "DeviceGray",
            ColorSpaceFamily::Rgb => "DeviceRGB",
            ColorSpaceFamily::Cmyk => "DeviceCMYK",
        }
    }

    /// Name of the default color space resource that remaps this family.
    pub fn default_resource_name(&self) -> &'static str {
        match self {
            ColorSpaceFamily::Gray => "DefaultGray",
            ColorSpaceFamily::Rgb => "DefaultRGB",
            ColorSpaceFamily::Cmyk => "DefaultCMYK",
        }
    }

    /// Number of components.
    pub fn components(&self) -> u8 {
        match self {
            ColorSpaceFamily::Gray => 1,
            ColorSpaceFamily::Rgb => 3,
            ColorSpaceFamily::Cmyk => 4,
        }
    }

    /// Family of a device color space name, abbreviations included.
    pub fn from_device_name(name: &str) -> Option<Self> {
        match name {
            "DeviceGray" | "G" => Some(ColorSpaceFamily::Gray),
            "DeviceRGB" | "RGB" => Some(ColorSpaceFamily::Rgb),
            "DeviceCMYK" | "CMYK" => Some(ColorSpaceFamily::Cmyk),
            _ => None,
        }
    }
}

impl fmt::Display for ColorSpaceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.device_name())
    }
}

/// A resolved color space.
#[derive(Debug, Clone, PartialEq)]
pub enum ColorSpace {
    /// DeviceGray, DeviceRGB or DeviceCMYK
    Device(ColorSpaceFamily),
    /// ICCBased
    IccBased(IccProfile),
    /// CalGray, CalRGB or Lab
    CieBased(String),
    /// Separation with its alternate space
    Separation {
        /// Colorant name
        name: String,
        /// Alternate space
        alternate: Box<ColorSpace>,
    },
    /// DeviceN with its alternate space
    DeviceN {
        /// Colorant names
        names: Vec<String>,
        /// Alternate space
        alternate: Box<ColorSpace>,
    },
    /// Indexed over a base space
    Indexed(Box<ColorSpace>),
    /// Pattern, optionally with an underlying space for uncolored patterns
    Pattern(Option<Box<ColorSpace>>),
}

impl ColorSpace {
    /// DeviceGray.
    pub const GRAY: ColorSpace = ColorSpace::Device(ColorSpaceFamily::Gray);
    /// DeviceRGB.
    pub const RGB: ColorSpace = ColorSpace::Device(ColorSpaceFamily::Rgb);
    /// DeviceCMYK.
    pub const CMYK: ColorSpace = ColorSpace::Device(ColorSpaceFamily::Cmyk);

    /// Short label used in diagnostics.
    pub fn label(&self) -> String {
        match self {
            ColorSpace::Device(family) => family.device_name().to_string(),
            ColorSpace::IccBased(profile) => format!("ICCBased (N {})", profile.components()),
            ColorSpace::CieBased(name) => name.clone(),
            ColorSpace::Separation { name, .. } => format!("Separation {}", name),
            ColorSpace::DeviceN { .. } => "DeviceN".to_string(),
            ColorSpace::Indexed(_) => "Indexed".to_string(),
            ColorSpace::Pattern(_) => "Pattern".to_string(),
        }
    }

    /// Resolve a color space object (name or array) against the store.
    ///
    /// `named` looks up resource names that are not built-in spaces.
    pub fn from_object<'a, F>(object: &'a Object, store: &'a ObjectStore, named: F) -> Result<ColorSpace>
    where
        F: Fn(&str) -> Option<&'a Object> + Copy,
    {
        Self::resolve_with_depth(object, store, named, 0)
    }

    fn resolve_with_depth<'a, F>(
        object: &'a Object,
        store: &'a ObjectStore,
        named: F,
        depth: usize,
    ) -> Result<ColorSpace>
    where
        F: Fn(&str) -> Option<&'a Object> + Copy,
    {
        if depth > 8 {
            return Err(Error::InvalidPdf("color space nesting too deep".to_string()));
        }
        let recurse = |obj: &'a Object| Self::resolve_with_depth(obj, store, named, depth + 1);

        match store.resolve(object) {
            Object::Name(name) => {
                if let Some(family) = ColorSpaceFamily::from_device_name(name) {
                    return Ok(ColorSpace::Device(family));
                }
                match name.as_str() {
                    "Pattern" => Ok(ColorSpace::Pattern(None)),
                    "CalGray" | "CalRGB" | "Lab" => Ok(ColorSpace::CieBased(name.clone())),
                    other => match named(other) {
                        Some(resource) => recurse(resource),
                        None => Err(Error::MissingResource {
                            category: "ColorSpace".to_string(),
                            name: other.to_string(),
                        }),
                    },
                }
            },
            Object::Array(items) => {
                let family = items.first().and_then(Object::as_name).unwrap_or("");
                match family {
                    "ICCBased" => {
                        let stream = items
                            .get(1)
                            .map(|o| store.resolve(o))
                            .ok_or_else(|| Error::InvalidPdf("ICCBased without stream".to_string()))?;
                        Ok(ColorSpace::IccBased(icc_from_stream(stream)?))
                    },
                    "CalGray" | "CalRGB" | "Lab" => Ok(ColorSpace::CieBased(family.to_string())),
                    "Separation" => {
                        let name = items.get(1).and_then(Object::as_name).unwrap_or("").to_string();
                        let alternate = items
                            .get(2)
                            .ok_or_else(|| Error::InvalidPdf("Separation without alternate".to_string()))?;
                        Ok(ColorSpace::Separation {
                            name,
                            alternate: Box::new(recurse(alternate)?),
                        })
                    },
                    "DeviceN" => {
                        let names = items
                            .get(1)
                            .map(|o| store.resolve(o))
                            .and_then(Object::as_array)
                            .map(|a| a.iter().filter_map(Object::as_name).map(str::to_string).collect())
                            .unwrap_or_default();
                        let alternate = items
                            .get(2)
                            .ok_or_else(|| Error::InvalidPdf("DeviceN without alternate".to_string()))?;
                        Ok(ColorSpace::DeviceN {
                            names,
                            alternate: Box::new(recurse(alternate)?),
                        })
                    },
                    "Indexed" | "I" => {
                        let base = items
                            .get(1)
                            .ok_or_else(|| Error::InvalidPdf("Indexed without base".to_string()))?;
                        Ok(ColorSpace::Indexed(Box::new(recurse(base)?)))
                    },
                    "Pattern" => match items.get(1) {
                        Some(under) => Ok(ColorSpace::Pattern(Some(Box::new(recurse(under)?)))),
                        None => Ok(ColorSpace::Pattern(None)),
                    },
                    other => Err(Error::InvalidPdf(format!("unknown color space family {}", other))),
                }
            },
            other => Err(Error::InvalidObjectType {
                expected: "color space".to_string(),
                found: other.type_name().to_string(),
            }),
        }
    }

    /// Serialize, adding an ICC stream to the store when needed.
    pub fn to_object(&self, store: &mut ObjectStore) -> Object {
        match self {
            ColorSpace::Device(family) => Object::name(family.device_name()),
            ColorSpace::IccBased(profile) => {
                let stream = store.insert(icc_stream(profile));
                Object::Array(vec![Object::name("ICCBased"), Object::Reference(stream)])
            },
            ColorSpace::CieBased(name) => Object::Array(vec![
                Object::name(name.as_str()),
                Object::dict([("WhitePoint", Object::numbers(&[0.9505, 1.0, 1.089]))]),
            ]),
            ColorSpace::Separation { name, alternate } => Object::Array(vec![
                Object::name("Separation"),
                Object::name(name.as_str()),
                alternate.to_object(store),
                identity_tint_function(alternate.component_count()),
            ]),
            ColorSpace::DeviceN { names, alternate } => Object::Array(vec![
                Object::name("DeviceN"),
                Object::Array(names.iter().map(|n| Object::name(n.as_str())).collect()),
                alternate.to_object(store),
                identity_tint_function(alternate.component_count()),
            ]),
            ColorSpace::Indexed(base) => Object::Array(vec![
                Object::name("Indexed"),
                base.to_object(store),
                Object::Integer(0),
                Object::String(vec![0; base.component_count() as usize]),
            ]),
            ColorSpace::Pattern(None) => Object::name("Pattern"),
            ColorSpace::Pattern(Some(under)) => {
                Object::Array(vec![Object::name("Pattern"), under.to_object(store)])
            },
        }
    }

    /// Number of color components.
    pub fn component_count(&self) -> u8 {
        match self {
            ColorSpace::Device(family) => family.components(),
            ColorSpace::IccBased(profile) => profile.components(),
            ColorSpace::CieBased(name) if name == "CalGray" => 1,
            ColorSpace::CieBased(_) => 3,
            ColorSpace::Separation { .. } | ColorSpace::Indexed(_) | ColorSpace::Pattern(_) => 1,
            ColorSpace::DeviceN { names, .. } => names.len() as u8,
        }
    }
}

/// Build the stream object for an ICC profile.
pub fn icc_stream(profile: &IccProfile) -> Object {
    let mut dict = Dictionary::new();
    dict.insert("N".to_string(), Object::Integer(profile.components() as i64));
    Object::stream(dict, profile.data().clone())
}

/// Read an ICC stream back into a profile.
pub fn icc_from_stream(stream: &Object) -> Result<IccProfile> {
    let components = stream
        .as_dict()
        .and_then(|d| d.get("N"))
        .and_then(Object::as_integer)
        .ok_or_else(|| Error::InvalidPdf("ICC stream without /N".to_string()))?;
    let data = stream.decode_stream_data()?;
    Ok(IccProfile::new(data, components as u8))
}

fn identity_tint_function(outputs: u8) -> Object {
    let range: Vec<f64> = (0..outputs).flat_map(|_| [0.0, 1.0]).collect();
    Object::dict([
        ("FunctionType", Object::Integer(2)),
        ("Domain", Object::numbers(&[0.0, 1.0])),
        ("C0", Object::numbers(&vec![0.0; outputs as usize])),
        ("C1", Object::numbers(&vec![1.0; outputs as usize])),
        ("N", Object::Real(1.0)),
        ("Range", Object::numbers(&range)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::icc::synthetic_profile;

    fn no_resources<'a>(_: &str) -> Option<&'a Object> {
        None
    }

    #[test]
    fn test_device_names() {
        let store = ObjectStore::new();
        assert_eq!(
            ColorSpace::from_object(&Object::name("DeviceRGB"), &store, no_resources).unwrap(),
            ColorSpace::RGB
        );
        assert_eq!(
            ColorSpace::from_object(&Object::name("G"), &store, no_resources).unwrap(),
            ColorSpace::GRAY
        );
    }

    #[test]
    fn test_unknown_name_is_missing_resource() {
        let store = ObjectStore::new();
        let err = ColorSpace::from_object(&Object::name("CS9"), &store, no_resources).unwrap_err();
        assert!(matches!(err, Error::MissingResource { .. }));
    }

    #[test]
    fn test_icc_round_trip_through_store() {
        let mut store = ObjectStore::new();
        let profile = IccProfile::new(synthetic_profile(b"RGB ", b"mntr", 2), 3);
        let obj = ColorSpace::IccBased(profile.clone()).to_object(&mut store);
        let resolved = ColorSpace::from_object(&obj, &store, no_resources).unwrap();
        assert_eq!(resolved, ColorSpace::IccBased(profile));
    }

    #[test]
    fn test_separation_alternate_resolves() {
        let mut store = ObjectStore::new();
        let sep = ColorSpace::Separation {
            name: "Spot".to_string(),
            alternate: Box::new(ColorSpace::CMYK),
        };
        let obj = sep.to_object(&mut store);
        let resolved = ColorSpace::from_object(&obj, &store, no_resources).unwrap();
        assert_eq!(resolved, sep);
    }

    #[test]
    fn test_named_resource_lookup() {
        let store = ObjectStore::new();
        let target = Object::name("DeviceCMYK");
        let lookup = |name: &str| if name == "CS0" { Some(&target) } else { None };
        assert_eq!(
            ColorSpace::from_object(&Object::name("CS0"), &store, lookup).unwrap(),
            ColorSpace::CMYK
        );
    }
}
