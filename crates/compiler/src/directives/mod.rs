//! Compilation directives
//!
//! A directive is the instruction the compiler emits for one destination
//! file: where the installer should get its bytes from. Each directive type
//! is defined in its own file; [`Directive`] unifies them under the `$type`
//! tag used in the modlist JSON.

use serde::{Deserialize, Serialize};

use crate::vfs::Hash;

pub mod from_archive;
pub mod ignored_directly;
pub mod inline_file;
pub mod no_match;
pub mod property_file;

pub use from_archive::FromArchive;
pub use ignored_directly::IgnoredDirectlyDirective;
pub use inline_file::InlineFileDirective;
pub use no_match::NoMatchDirective;
pub use property_file::{PropertyFileDirective, PropertyType};

/// Unified directive enum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "$type")]
pub enum Directive {
    FromArchive(FromArchive),
    InlineFile(InlineFileDirective),
    PropertyFile(PropertyFileDirective),
    IgnoredDirectly(IgnoredDirectlyDirective),
    NoMatch(NoMatchDirective),
}

impl Directive {
    /// Destination path relative to the install directory
    pub fn to(&self) -> &str {
        match self {
            Directive::FromArchive(d) => &d.to,
            Directive::InlineFile(d) => &d.to,
            Directive::PropertyFile(d) => &d.to,
            Directive::IgnoredDirectly(d) => &d.to,
            Directive::NoMatch(d) => &d.to,
        }
    }

    /// Content hash of the destination file
    pub fn hash(&self) -> Hash {
        match self {
            Directive::FromArchive(d) => d.hash,
            Directive::InlineFile(d) => d.hash,
            Directive::PropertyFile(d) => d.hash,
            Directive::IgnoredDirectly(d) => d.hash,
            Directive::NoMatch(d) => d.hash,
        }
    }

    pub fn size(&self) -> u64 {
        match self {
            Directive::FromArchive(d) => d.size,
            Directive::InlineFile(d) => d.size,
            Directive::PropertyFile(d) => d.size,
            Directive::IgnoredDirectly(d) => d.size,
            Directive::NoMatch(d) => d.size,
        }
    }

    /// The `$type` tag of this directive
    pub fn type_name(&self) -> &'static str {
        match self {
            Directive::FromArchive(_) => "FromArchive",
            Directive::InlineFile(_) => "InlineFile",
            Directive::PropertyFile(_) => "PropertyFile",
            Directive::IgnoredDirectly(_) => "IgnoredDirectly",
            Directive::NoMatch(_) => "NoMatch",
        }
    }

    pub fn is_ignored(&self) -> bool {
        matches!(self, Directive::IgnoredDirectly(_))
    }

    pub fn is_no_match(&self) -> bool {
        matches!(self, Directive::NoMatch(_))
    }

    /// Whether the installer needs the modlist's embedded data for this file
    pub fn is_inline(&self) -> bool {
        matches!(self, Directive::InlineFile(_) | Directive::PropertyFile(_))
    }

    /// Id of the embedded data blob, if any
    pub fn source_data_id(&self) -> Option<&str> {
        match self {
            Directive::InlineFile(d) => Some(&d.source_data_id),
            Directive::PropertyFile(d) => Some(&d.source_data_id),
            _ => None,
        }
    }
}

impl From<FromArchive> for Directive {
    fn from(d: FromArchive) -> Self {
        Directive::FromArchive(d)
    }
}

impl From<InlineFileDirective> for Directive {
    fn from(d: InlineFileDirective) -> Self {
        Directive::InlineFile(d)
    }
}

impl From<PropertyFileDirective> for Directive {
    fn from(d: PropertyFileDirective) -> Self {
        Directive::PropertyFile(d)
    }
}

impl From<IgnoredDirectlyDirective> for Directive {
    fn from(d: IgnoredDirectlyDirective) -> Self {
        Directive::IgnoredDirectly(d)
    }
}

impl From<NoMatchDirective> for Directive {
    fn from(d: NoMatchDirective) -> Self {
        Directive::NoMatch(d)
    }
}
