//! Rename-pattern expansion.

use chrono::{DateTime, Local};
use std::path::Path;

/// Inputs available to a rename pattern
#[derive(Debug, Clone)]
pub struct RenameContext<'a> {
    pub category: &'a str,
    pub counter: u64,
    pub now: DateTime<Local>,
}

/// Expand a rename pattern for `source`.
///
/// `{original_ext}` expands without the leading dot. Whatever the pattern
/// produces, the result always ends in the source's extension, and path
/// separators are replaced so the name stays a single component.
pub fn expand_rename_pattern(pattern: &str, source: &Path, ctx: &RenameContext<'_>) -> String {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("file");
    let ext = source.extension().and_then(|e| e.to_str()).unwrap_or("");

    let expanded = pattern
        .replace("{original_name}", stem)
        .replace("{original_ext}", ext)
        .replace("{category}", ctx.category)
        .replace("{datetime}", &ctx.now.format("%Y-%m-%d_%H-%M-%S").to_string())
        .replace("{date}", &ctx.now.format("%Y-%m-%d").to_string())
        .replace("{counter}", &ctx.counter.to_string());

    let sanitized: String = expanded
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();

    force_extension(&sanitized, ext)
}

/// Make `name` end in `.ext`, replacing any other extension it carries.
///
/// An empty `ext` leaves the name untouched.
pub fn force_extension(name: &str, ext: &str) -> String {
    if ext.is_empty() {
        return name.to_string();
    }

    let path = Path::new(name);
    match path.extension().and_then(|e| e.to_str()) {
        Some(current) if current == ext => name.to_string(),
        Some(_) => {
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(name);
            format!("{}.{}", stem, ext)
        }
        None => format!("{}.{}", name.trim_end_matches('.'), ext),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ctx(counter: u64) -> RenameContext<'static> {
        RenameContext {
            category: "Invoices",
            counter,
            now: Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap(),
        }
    }

    #[test]
    fn substitutes_all_placeholders() {
        let name = expand_rename_pattern(
            "{category}_{date}_{original_name}_{counter}",
            Path::new("/in/scan.pdf"),
            &ctx(3),
        );
        assert_eq!(name, "Invoices_2024-03-09_scan_3.pdf");
    }

    #[test]
    fn datetime_placeholder_is_not_clobbered_by_date() {
        let name = expand_rename_pattern("{datetime}", Path::new("a.txt"), &ctx(1));
        assert_eq!(name, "2024-03-09_14-05-07.txt");
    }

    #[test]
    fn pattern_extension_is_replaced_with_original() {
        let name = expand_rename_pattern("{original_name}.docx", Path::new("notes.txt"), &ctx(1));
        assert_eq!(name, "notes.txt");
    }

    #[test]
    fn original_ext_placeholder_is_dotless() {
        let name = expand_rename_pattern(
            "{original_name}.{original_ext}",
            Path::new("photo.JPG"),
            &ctx(1),
        );
        assert_eq!(name, "photo.JPG");
    }

    #[test]
    fn separators_are_sanitized() {
        let name = expand_rename_pattern("a/b\\{original_name}", Path::new("x.md"), &ctx(1));
        assert_eq!(name, "a_b_x.md");
    }

    #[test]
    fn extensionless_source_keeps_name() {
        assert_eq!(force_extension("Makefile", ""), "Makefile");
        assert_eq!(force_extension("report", "pdf"), "report.pdf");
    }
}
