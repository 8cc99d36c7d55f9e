//! # Rules Module
//!
//! User-defined rules that classify a file by name, extension, content,
//! size or date.
//!
//! ## How It Works
//! 1. Rules are kept sorted by ascending priority
//! 2. Each file is tested against enabled rules in that order
//! 3. The first match wins and may supply a rename
//!
//! ## Example
//! ```rust,ignore
//! let matcher = RuleMatcher::new(RuleStore::load(&rules_path)?)?;
//! let result = matcher.evaluate(Path::new("/downloads/invoice_03.pdf"));
//! ```

mod matcher;
mod store;
mod template;
mod types;
mod values;

pub use matcher::{
    evaluate, normalize_extensions, validate_rule, RuleMatcher, CONTENT_READ_LIMIT,
    TEXT_EXTENSIONS,
};
pub use store::{RuleStore, RULES_FORMAT_VERSION};
pub use template::{expand_rename_pattern, force_extension, RenameContext};
pub use types::{OrganizationRule, RuleMatchResult, RuleOperator, RuleType};
pub use values::{parse_size, resolve_date};
