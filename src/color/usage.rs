//! Color usage checks.
//!
//! One [`ColorUsageChecker`] lives per document: the device families it has
//! accepted so far are remembered across pages, because mixing families is
//! judged for the whole file.

use super::icc::IccProfile;
use super::output_intent::OutputIntent;
use super::space::{ColorSpace, ColorSpaceFamily};
use crate::compliance::profile::ProfileDescriptor;
use crate::compliance::violation::{RuleId, ViolationReporter};
use crate::error::Result;

/// Default color spaces bound in the resource dictionary in effect.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefaultColorSpaces {
    /// /DefaultGray
    pub gray: Option<ColorSpace>,
    /// /DefaultRGB
    pub rgb: Option<ColorSpace>,
    /// /DefaultCMYK
    pub cmyk: Option<ColorSpace>,
}

impl DefaultColorSpaces {
    /// The default space remapping `family`, if bound. A default that is
    /// itself a device space remaps nothing.
    pub fn for_family(&self, family: ColorSpaceFamily) -> Option<&ColorSpace> {
        let space = match family {
            ColorSpaceFamily::Gray => self.gray.as_ref(),
            ColorSpaceFamily::Rgb => self.rgb.as_ref(),
            ColorSpaceFamily::Cmyk => self.cmyk.as_ref(),
        };
        space.filter(|space| !matches!(space, ColorSpace::Device(_)))
    }
}

/// What is in scope for one color operation.
#[derive(Debug, Clone, Copy)]
pub struct ColorScope<'a> {
    /// Page-level intents if the page has any, else the document-level ones
    pub output_intents: &'a [OutputIntent],
    /// Default color spaces of the current resource dictionary
    pub defaults: &'a DefaultColorSpaces,
    /// Blending color space profile of the enclosing transparency group
    pub blending_profile: Option<&'a IccProfile>,
}

impl<'a> ColorScope<'a> {
    fn pdfa_intents(&self) -> impl Iterator<Item = &'a OutputIntent> {
        self.output_intents.iter().filter(|i| i.is_pdfa())
    }

    /// Whether any PDF/A output intent is in scope.
    pub fn has_output_intent(&self) -> bool {
        self.pdfa_intents().next().is_some()
    }
}

/// Decides whether each color space use is legal.
#[derive(Debug, Clone)]
pub struct ColorUsageChecker {
    reporter: ViolationReporter,
    unchecked_device_color: bool,
    max_icc_major_version: u8,
    used_families: Vec<ColorSpaceFamily>,
}

impl ColorUsageChecker {
    /// Create a checker for a profile.
    pub fn new(descriptor: &ProfileDescriptor) -> Self {
        Self {
            reporter: ViolationReporter::new(descriptor.level()),
            unchecked_device_color: descriptor.unchecked_device_color,
            max_icc_major_version: descriptor.max_icc_major_version,
            used_families: Vec::new(),
        }
    }

    /// Device families accepted so far, in first-use order.
    pub fn used_families(&self) -> &[ColorSpaceFamily] {
        &self.used_families
    }

    /// Check one use of `space`. `label` names the space in diagnostics,
    /// usually the resource name.
    pub fn check_color_space(&mut self, space: &ColorSpace, label: &str, scope: &ColorScope<'_>) -> Result<()> {
        match space {
            ColorSpace::Device(family) => self.check_device(*family, scope),
            ColorSpace::IccBased(profile) => self.check_icc(profile, label, scope),
            ColorSpace::CieBased(_) | ColorSpace::Pattern(None) => Ok(()),
            ColorSpace::Separation { alternate, .. } | ColorSpace::DeviceN { alternate, .. } => {
                self.check_color_space(alternate, label, scope)
            },
            ColorSpace::Indexed(base) => self.check_color_space(base, label, scope),
            ColorSpace::Pattern(Some(under)) => self.check_color_space(under, label, scope),
        }
    }

    /// Check one use of a device family.
    pub fn check_device(&mut self, family: ColorSpaceFamily, scope: &ColorScope<'_>) -> Result<()> {
        if !scope.has_output_intent() {
            if let Some(previous) = self.used_families.iter().find(|f| **f != family) {
                return self.reporter.raise_with(
                    RuleId::DeviceColorsMixedWithoutOutputIntent,
                    [previous.device_name(), family.device_name()],
                );
            }
        }

        let legal = self.unchecked_device_color
            || scope.pdfa_intents().any(|intent| match family {
                ColorSpaceFamily::Gray => true,
                _ => intent.family() == Some(family),
            })
            || scope.defaults.for_family(family).is_some();

        if !legal {
            return self.reporter.raise_with(
                RuleId::DeviceColorNotPermitted,
                [family.device_name(), family.default_resource_name()],
            );
        }

        if !self.used_families.contains(&family) {
            self.used_families.push(family);
        }
        Ok(())
    }

    fn check_icc(&mut self, profile: &IccProfile, label: &str, scope: &ColorScope<'_>) -> Result<()> {
        self.check_icc_profile(profile)?;

        for intent in scope.pdfa_intents() {
            if let Some(intent_profile) = &intent.profile {
                if intent_profile.components() == profile.components() && intent_profile.same_content(profile) {
                    return self
                        .reporter
                        .raise_with(RuleId::DuplicateIccProfile, [label, "output intent"]);
                }
            }
        }
        if let Some(blending) = scope.blending_profile {
            if blending.components() == profile.components() && blending.same_content(profile) {
                return self
                    .reporter
                    .raise_with(RuleId::DuplicateIccProfile, [label, "transparency group"]);
            }
        }
        Ok(())
    }

    /// Header checks shared by color spaces and output intents.
    pub fn check_icc_profile(&self, profile: &IccProfile) -> Result<()> {
        if let Some(header) = profile.header() {
            if let Some(components) = header.components() {
                if components != profile.components() {
                    return self.reporter.raise_with(
                        RuleId::IccComponentCountMismatch,
                        [profile.components().to_string(), components.to_string()],
                    );
                }
            }
            if header.major_version > self.max_icc_major_version {
                return self.reporter.raise_with(
                    RuleId::IccProfileVersionNotSupported,
                    [header.version(), self.max_icc_major_version.to_string()],
                );
            }
        }
        Ok(())
    }
}
