//! PDF/A conformance rules.
//!
//! One engine serves every built-in profile. A [`ProfileDescriptor`]
//! holds the data of a profile (limits, permitted features and the rule
//! tables in [`rules`]); the checkers look rules up in it instead of
//! branching on the part. Violations are raised as
//! [`crate::Error::Conformance`] carrying a [`ConformanceViolation`].
//!
//! ## PDF/A Conformance Levels
//!
//! - **PDF/A-1b**, **PDF/A-1a**: PDF 1.4, no transparency, no embedded files
//! - **PDF/A-2b**, **-2a**, **-2u**: PDF 1.7, transparency, JPEG2000,
//!   embedded PDF/A files
//! - **PDF/A-3b**, **-3a**, **-3u**: PDF/A-2 plus embedded files of any type
//! - **PDF/A-4**, **-4e**, **-4f**: PDF 2.0; 4f requires embedded files,
//!   4e permits 3D and rich media annotations
//!
//! ## Example
//!
//! ```no_run
//! use pdfa_conformance::compliance::{PdfALevel, PdfAValidator};
//!
//! let bytes = std::fs::read("archive.pdf")?;
//! match PdfAValidator::new(PdfALevel::A2b).validate_bytes(&bytes) {
//!     Ok(()) => println!("conforms to PDF/A-2b"),
//!     Err(e) => match e.violation() {
//!         Some(v) => println!("{}: {}", v.code(), v.message()),
//!         None => return Err(e.into()),
//!     },
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod checker;
pub mod profile;
pub mod rules;
pub mod types;
pub mod validator;
pub mod violation;

pub use checker::{DocumentView, PageRecord, StructureChecker};
pub use profile::{ProfileDescriptor, TransparencyPolicy};
pub use types::{ConformanceLevel, PdfALevel, PdfAPart, PdfVersion};
pub use validator::{detect_level, PdfAValidator};
pub use violation::{ConformanceViolation, RuleId, ViolationReporter};
