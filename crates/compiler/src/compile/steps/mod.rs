//! Built-in compilation steps
//!
//! Each step lives in its own file; [`StepState`](crate::compile::StepState)
//! maps the persisted form back to these types.

pub mod direct_match;
pub mod drop_all;
pub mod ignore_ends_with;
pub mod ignore_game_files;
pub mod ignore_install_cruft;
pub mod ignore_regex;
pub mod ignore_starts_with;
pub mod include_property_files;
pub mod include_regex;

pub use direct_match::DirectMatch;
pub use drop_all::DropAll;
pub use ignore_ends_with::IgnoreEndsWith;
pub use ignore_game_files::IgnoreGameFiles;
pub use ignore_install_cruft::IgnoreInstallCruft;
pub use ignore_regex::IgnoreRegex;
pub use ignore_starts_with::IgnoreStartsWith;
pub use include_property_files::IncludePropertyFiles;
pub use include_regex::IncludeRegex;
