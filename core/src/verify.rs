//! Case-wide checks: required entries, enum values and a textual lint for
//! obviously broken dictionary syntax.

use std::path::{Path, PathBuf};

use ofti_types::{EntryPath, normalize_scalar_token};

use crate::case::{discover_case_files, relative_display};
use crate::dictionary::DictionaryBackend;

/// Outcome of checking one dictionary file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileCheck {
    pub path: PathBuf,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl FileCheck {
    /// Menu label, e.g. `system/fvSolution: ERROR (2)`.
    #[must_use]
    pub fn label(&self, case_dir: &Path) -> String {
        let rel = relative_display(case_dir, &self.path);
        if !self.errors.is_empty() {
            format!("{rel}: ERROR ({})", self.errors.len())
        } else if !self.warnings.is_empty() {
            format!("{rel}: Warn ({})", self.warnings.len())
        } else {
            format!("{rel}: OK")
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    /// Text shown when a result is opened.
    #[must_use]
    pub fn report(&self, case_dir: &Path) -> String {
        let rel = relative_display(case_dir, &self.path);
        let mut lines = vec![format!("Check results for {rel}"), String::new()];
        if self.is_ok() {
            lines.push("No problems found.".to_string());
        }
        if !self.errors.is_empty() {
            lines.push("Errors:".to_string());
            lines.extend(self.errors.iter().map(|e| format!("  - {e}")));
        }
        if !self.warnings.is_empty() {
            if !self.errors.is_empty() {
                lines.push(String::new());
            }
            lines.push("Warnings:".to_string());
            lines.extend(self.warnings.iter().map(|w| format!("  - {w}")));
        }
        lines.join("\n")
    }
}

/// Entry names listed as required in `foamDictionary -info` output.
///
/// Handles both `Required entries: type value` and a `Required entries:`
/// header followed by a block of names. The block ends at a blank line or at
/// the next `something:` heading.
#[must_use]
pub fn parse_required_entries(info: &[String]) -> Vec<String> {
    let mut required: Vec<String> = Vec::new();
    let mut capturing = false;

    for raw in info {
        let line = raw.trim();
        let lower = line.to_lowercase();

        if line.is_empty() {
            capturing = false;
            continue;
        }
        if lower.starts_with("optional") {
            continue;
        }
        if lower.starts_with("required entries") || lower.starts_with("required entry") {
            capturing = true;
            let inline = line.split_once(':').map_or("", |(_, rest)| rest);
            if !inline.trim().is_empty() {
                required.extend(split_requirement_line(inline));
                capturing = false;
            }
            continue;
        }
        if capturing {
            if line.contains(':') && !lower.starts_with("required") {
                capturing = false;
                continue;
            }
            required.extend(split_requirement_line(line));
        }
    }

    let mut unique: Vec<String> = Vec::with_capacity(required.len());
    for item in required {
        if !unique.contains(&item) {
            unique.push(item);
        }
    }
    unique
}

fn split_requirement_line(text: &str) -> Vec<String> {
    text.trim_matches(|c| matches!(c, '-' | ':' | ' '))
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|tok| !tok.is_empty())
        .filter(|tok| !matches!(tok.to_lowercase().as_str(), "entries" | "entry"))
        .map(ToString::to_string)
        .collect()
}

/// Required names absent from `available`, in required order.
#[must_use]
pub fn missing_required_entries(required: &[String], available: &[String]) -> Vec<String> {
    required
        .iter()
        .filter(|req| !available.contains(req))
        .cloned()
        .collect()
}

/// Checks every dictionary file in the case. `progress` is called before
/// each file.
pub fn verify_case(
    backend: &dyn DictionaryBackend,
    case_dir: &Path,
    mut progress: impl FnMut(&Path),
) -> Vec<FileCheck> {
    let files = discover_case_files(case_dir);
    let mut results = Vec::new();

    for file in files.iter() {
        progress(file);
        let mut result = FileCheck {
            path: file.clone(),
            ..FileCheck::default()
        };

        match backend.list_keywords(file, None) {
            Err(err) => {
                let message = err.to_string();
                let message = message.trim();
                result.errors.push(if message.is_empty() {
                    "Unknown error".to_string()
                } else {
                    message.to_string()
                });
            }
            Ok(keys) => {
                for key in &keys {
                    check_entry(backend, file, &EntryPath::new(key), &mut result);
                }
                if keys.iter().any(|k| k == "boundaryField") {
                    let boundary = EntryPath::new("boundaryField");
                    let patches = backend
                        .list_keywords(file, Some(&boundary))
                        .unwrap_or_default();
                    for patch in patches {
                        check_entry(backend, file, &boundary.child(&patch), &mut result);
                    }
                }
            }
        }
        tracing::debug!(
            file = %file.display(),
            errors = result.errors.len(),
            "Checked dictionary"
        );
        results.push(result);
    }
    results
}

fn check_entry(
    backend: &dyn DictionaryBackend,
    file: &Path,
    key: &EntryPath,
    result: &mut FileCheck,
) {
    let required = parse_required_entries(&backend.entry_info(file, key));
    if !required.is_empty() {
        let available = backend.list_keywords(file, Some(key)).unwrap_or_default();
        let missing = missing_required_entries(&required, &available);
        if !missing.is_empty() {
            result.errors.push(format!(
                "{key}: missing required entries: {}",
                missing.join(", ")
            ));
        }
    }

    let allowed: Vec<String> = backend
        .entry_enum_values(file, key)
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();
    if allowed.is_empty() {
        return;
    }
    let value = match backend.read_entry(file, key) {
        Ok(value) => value,
        Err(err) => {
            result.errors.push(format!("{key}: {err}"));
            return;
        }
    };
    let token = normalize_scalar_token(&value);
    if !token.is_empty() && !allowed.contains(&token) {
        let mut sorted = allowed;
        sorted.sort();
        sorted.dedup();
        result.errors.push(format!(
            "{key}: invalid value '{token}'. Allowed: {}",
            sorted.join(", ")
        ));
    }
}

/// Lines that look syntactically wrong: stray `}`, statements without a
/// terminating `;`, and unbalanced braces at end of file.
///
/// The banner comment before `FoamFile` is skipped; block and line comments
/// are ignored.
#[must_use]
pub fn find_suspicious_lines(content: &str) -> Vec<String> {
    let lines: Vec<&str> = content.lines().collect();
    let mut warnings = Vec::new();
    let mut depth: i64 = 0;
    let mut header_done = false;
    let mut in_block_comment = false;

    for (index, raw) in lines.iter().enumerate() {
        let line_no = index + 1;
        let stripped = raw.trim();

        if !header_done {
            if stripped.is_empty() || stripped.starts_with(['/', '*', '|', '\\']) {
                continue;
            }
            header_done = true;
            if stripped.to_lowercase().contains("foamfile") {
                continue;
            }
        }

        let (code, still_in_block) = strip_block_comments(raw, in_block_comment);
        in_block_comment = still_in_block;
        if in_block_comment {
            continue;
        }
        let code = code.split_once("//").map_or(code.as_str(), |(before, _)| before);
        let code_trimmed = code.trim();
        if code_trimmed.is_empty() {
            continue;
        }

        for ch in code.chars() {
            match ch {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth < 0 {
                        warnings.push(format!("Line {line_no}: unexpected '}}'."));
                        depth = 0;
                    }
                }
                _ => {}
            }
        }

        if skips_semicolon_check(code_trimmed, code, next_significant_line(&lines, index)) {
            continue;
        }
        let preview: String = code_trimmed.chars().take(60).collect();
        warnings.push(format!("Line {line_no}: missing ';'? -> {preview}"));
    }

    if depth > 0 {
        warnings.push("File ends with unmatched '{'.".to_string());
    }
    warnings
}

fn strip_block_comments(line: &str, mut in_block: bool) -> (String, bool) {
    let mut cleaned = String::new();
    let mut rest = line;
    while !rest.is_empty() {
        if in_block {
            match rest.find("*/") {
                Some(end) => {
                    rest = &rest[end + 2..];
                    in_block = false;
                }
                None => return (String::new(), true),
            }
            continue;
        }
        match rest.find("/*") {
            None => {
                cleaned.push_str(rest);
                break;
            }
            Some(start) => {
                cleaned.push_str(&rest[..start]);
                rest = &rest[start + 2..];
                match rest.find("*/") {
                    Some(end) => rest = &rest[end + 2..],
                    None => return (cleaned, true),
                }
            }
        }
    }
    (cleaned, in_block)
}

fn next_significant_line<'a>(lines: &[&'a str], index: usize) -> Option<&'a str> {
    lines[index + 1..]
        .iter()
        .map(|l| l.trim())
        .find(|l| !l.is_empty() && !l.starts_with("//") && !l.starts_with("/*") && !l.starts_with('*'))
}

fn skips_semicolon_check(trimmed: &str, code: &str, next: Option<&str>) -> bool {
    trimmed.starts_with('#')
        || (code.contains('{') && code.contains('}'))
        || trimmed.ends_with([';', '{', '}', '(', ')'])
        || next == Some("{")
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::{FileCheck, find_suspicious_lines, missing_required_entries, parse_required_entries, verify_case};
    use crate::testing::FakeDictionary;

    fn lines(text: &[&str]) -> Vec<String> {
        text.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn required_entries_inline() {
        let info = lines(&["fixedValue", "Required entries: type, value"]);
        assert_eq!(parse_required_entries(&info), ["type", "value"]);
    }

    #[test]
    fn required_entries_block_stops_at_heading() {
        let info = lines(&[
            "Required entries:",
            "  - type",
            "  - value",
            "optional: uniformValue",
            "  - type",
            "Description: boundary condition",
            "  - ignored",
        ]);
        assert_eq!(parse_required_entries(&info), ["type", "value"]);
    }

    #[test]
    fn required_entries_block_stops_at_blank_line() {
        let info = lines(&["required entry", "inletValue", "", "notRequired"]);
        assert_eq!(parse_required_entries(&info), ["inletValue"]);
    }

    #[test]
    fn missing_entries_keep_required_order() {
        let required = lines(&["type", "value", "gradient"]);
        let available = lines(&["value"]);
        assert_eq!(
            missing_required_entries(&required, &available),
            ["type", "gradient"]
        );
    }

    fn case_with(files: &[&str]) -> tempfile::TempDir {
        let case = tempfile::tempdir().expect("tempdir");
        for file in files {
            let path = case.path().join(file);
            fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
            fs::write(&path, "FoamFile {}\n").expect("write");
        }
        case
    }

    #[test]
    fn verify_reports_listing_failures_enums_and_missing_entries() {
        let case = case_with(&["system/controlDict", "system/fvSchemes", "0/U"]);
        let fake = FakeDictionary::new()
            .with_keywords("controlDict", &["startFrom"])
            .with_entry("startFrom", "beginning;")
            .with_enum("startFrom", &["startTime", "latestTime", "firstTime"])
            .with_failing_file("fvSchemes")
            .with_keywords("U", &["boundaryField"])
            .with_subkeys("boundaryField", &["inlet"])
            .with_info("boundaryField.inlet", &["Required entries: type value"])
            .with_subkeys("boundaryField.inlet", &["type"]);

        let mut seen = Vec::new();
        let results = verify_case(&fake, case.path(), |p| seen.push(p.to_path_buf()));
        assert_eq!(seen.len(), 3);

        let labels: Vec<String> = results.iter().map(|r| r.label(case.path())).collect();
        assert_eq!(
            labels,
            [
                "system/controlDict: ERROR (1)",
                "system/fvSchemes: ERROR (1)",
                "0/U: ERROR (1)"
            ]
        );
        assert_eq!(
            results[0].errors,
            ["startFrom: invalid value 'beginning'. Allowed: firstTime, latestTime, startTime"]
        );
        assert_eq!(results[1].errors, ["cannot open fvSchemes"]);
        assert_eq!(
            results[2].errors,
            ["boundaryField.inlet: missing required entries: value"]
        );
    }

    #[test]
    fn labels_and_report() {
        let ok = FileCheck {
            path: Path::new("/case/system/controlDict").to_path_buf(),
            ..FileCheck::default()
        };
        assert_eq!(ok.label(Path::new("/case")), "system/controlDict: OK");
        assert!(ok.report(Path::new("/case")).contains("No problems found."));

        let warn = FileCheck {
            path: Path::new("/case/0/p").to_path_buf(),
            warnings: vec!["Line 3: unexpected '}'.".to_string()],
            ..FileCheck::default()
        };
        assert_eq!(warn.label(Path::new("/case")), "0/p: Warn (1)");
    }

    #[test]
    fn suspicious_lines_skip_header_and_comments() {
        let text = "\
/*--------------------------------*- C++ -*----------------------------------*\\
| =========                 |                                                 |
\\*---------------------------------------------------------------------------*/
FoamFile
{
    version     2.0;
    format      ascii;
}
// * * * * //

application     icoFoam;   // solver
startFrom       startTime
/* multi
   line comment without semicolons
*/
functions
{
}
";
        assert_eq!(
            find_suspicious_lines(text),
            ["Line 12: missing ';'? -> startFrom       startTime"]
        );
    }

    #[test]
    fn suspicious_braces() {
        let text = "FoamFile\n{\n}\n}\nsolvers\n{\n    p { solver PCG; }\n";
        assert_eq!(
            find_suspicious_lines(text),
            ["Line 4: unexpected '}'.", "File ends with unmatched '{'."]
        );
    }
}
