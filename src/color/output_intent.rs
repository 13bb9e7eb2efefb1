//! Output intents.

use super::icc::IccProfile;
use super::space::{icc_from_stream, icc_stream};
use super::ColorSpaceFamily;
use crate::object::{Dictionary, Object};
use crate::store::ObjectStore;

/// Subtype of PDF/A output intents.
pub const PDFA_OUTPUT_INTENT_SUBTYPE: &str = "GTS_PDFA1";

/// An output intent dictionary.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputIntent {
    /// /S, "GTS_PDFA1" for PDF/A
    pub subtype: String,
    /// /OutputConditionIdentifier
    pub output_condition_identifier: String,
    /// /OutputCondition
    pub output_condition: Option<String>,
    /// /RegistryName
    pub registry_name: Option<String>,
    /// /Info
    pub info: Option<String>,
    /// /DestOutputProfile
    pub profile: Option<IccProfile>,
}

impl OutputIntent {
    /// A PDF/A output intent with a destination profile.
    pub fn pdfa(identifier: impl Into<String>, profile: IccProfile) -> Self {
        Self {
            subtype: PDFA_OUTPUT_INTENT_SUBTYPE.to_string(),
            output_condition_identifier: identifier.into(),
            output_condition: None,
            registry_name: None,
            info: None,
            profile: Some(profile),
        }
    }

    /// Set the registry name.
    pub fn with_registry_name(mut self, registry: impl Into<String>) -> Self {
        self.registry_name = Some(registry.into());
        self
    }

    /// Set the human-readable info string.
    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = Some(info.into());
        self
    }

    /// Whether this is a PDF/A output intent.
    pub fn is_pdfa(&self) -> bool {
        self.subtype == PDFA_OUTPUT_INTENT_SUBTYPE
    }

    /// Device family of the destination profile.
    pub fn family(&self) -> Option<ColorSpaceFamily> {
        let profile = self.profile.as_ref()?;
        profile.family().or(match profile.components() {
            1 => Some(ColorSpaceFamily::Gray),
            3 => Some(ColorSpaceFamily::Rgb),
            4 => Some(ColorSpaceFamily::Cmyk),
            _ => None,
        })
    }

    /// Serialize, adding the profile stream to the store.
    pub fn to_object(&self, store: &mut ObjectStore) -> Object {
        let mut dict = Dictionary::new();
        dict.insert("Type".to_string(), Object::name("OutputIntent"));
        dict.insert("S".to_string(), Object::name(self.subtype.as_str()));
        dict.insert(
            "OutputConditionIdentifier".to_string(),
            Object::string(&self.output_condition_identifier),
        );
        if let Some(condition) = &self.output_condition {
            dict.insert("OutputCondition".to_string(), Object::string(condition));
        }
        if let Some(registry) = &self.registry_name {
            dict.insert("RegistryName".to_string(), Object::string(registry));
        }
        if let Some(info) = &self.info {
            dict.insert("Info".to_string(), Object::string(info));
        }
        if let Some(profile) = &self.profile {
            let stream = store.insert(icc_stream(profile));
            dict.insert("DestOutputProfile".to_string(), Object::Reference(stream));
        }
        Object::Dictionary(dict)
    }

    /// Read an output intent dictionary. Unreadable profiles are treated as
    /// absent.
    pub fn from_dict(dict: &Dictionary, store: &ObjectStore) -> Self {
        let text = |key: &str| {
            store
                .entry(dict, key)
                .and_then(Object::as_string)
                .map(|s| String::from_utf8_lossy(s).into_owned())
        };
        let profile = store
            .entry(dict, "DestOutputProfile")
            .and_then(|stream| match icc_from_stream(stream) {
                Ok(profile) => Some(profile),
                Err(e) => {
                    log::warn!("Unreadable DestOutputProfile: {}", e);
                    None
                },
            });
        Self {
            subtype: store
                .entry(dict, "S")
                .and_then(Object::as_name)
                .unwrap_or_default()
                .to_string(),
            output_condition_identifier: text("OutputConditionIdentifier").unwrap_or_default(),
            output_condition: text("OutputCondition"),
            registry_name: text("RegistryName"),
            info: text("Info"),
            profile,
        }
    }

    /// Read an /OutputIntents array.
    pub fn from_array(array: &[Object], store: &ObjectStore) -> Vec<OutputIntent> {
        array
            .iter()
            .filter_map(|o| store.resolve_dict(o))
            .map(|d| OutputIntent::from_dict(d, store))
            .collect()
    }
}
