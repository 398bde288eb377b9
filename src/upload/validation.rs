use crate::upload::types::{CandidateFile, Rejection, ValidationOutcome};

pub const DEFAULT_ALLOWED_EXTENSIONS: [&str; 6] = [".pdf", ".doc", ".docx", ".xls", ".xlsx", ".txt"];

pub const UNSUPPORTED_EXTENSION: &str = "unsupported extension";
pub const MISSING_EXTENSION: &str = "missing file extension";

/// Set of lowercase, dot-prefixed extensions accepted for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct AllowList {
    extensions: Vec<String>,
}

impl Default for AllowList {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOWED_EXTENSIONS)
    }
}

impl AllowList {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for ext in extensions {
            let ext = ext.as_ref().trim().trim_start_matches('.').to_lowercase();
            if ext.is_empty() {
                continue;
            }
            let ext = format!(".{}", ext);
            if !normalized.contains(&ext) {
                normalized.push(ext);
            }
        }
        Self {
            extensions: normalized,
        }
    }

    /// Parses a comma separated list such as `pdf, .TXT`.
    pub fn parse(list: &str) -> Self {
        Self::new(list.split(','))
    }

    pub fn allows(&self, extension: &str) -> bool {
        self.extensions.iter().any(|e| e == extension)
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Human readable summary for the upload page, e.g. `PDF, DOC, TXT`.
    pub fn describe(&self) -> String {
        self.extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_uppercase())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Lowercase extension including the leading dot, taken after the last `.`.
pub fn extension_of(name: &str) -> Option<String> {
    name.rfind('.').map(|idx| name[idx..].to_lowercase())
}

/// Splits `files` into accepted and rejected, preserving input order.
pub fn validate(files: Vec<CandidateFile>, allow_list: &AllowList) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::default();

    for file in files {
        match extension_of(&file.name) {
            Some(ext) if allow_list.allows(&ext) => outcome.accepted.push(file),
            Some(_) => outcome.rejected.push(Rejection {
                name: file.name,
                reason: UNSUPPORTED_EXTENSION.to_string(),
            }),
            None => outcome.rejected.push(Rejection {
                name: file.name,
                reason: MISSING_EXTENSION.to_string(),
            }),
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(names: &[&str]) -> Vec<CandidateFile> {
        names
            .iter()
            .map(|n| CandidateFile::new(*n, "application/octet-stream", Vec::new()))
            .collect()
    }

    fn accepted_names(outcome: &ValidationOutcome) -> Vec<&str> {
        outcome.accepted.iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn partitions_mixed_batch_in_input_order() {
        let outcome = validate(
            files(&["report.pdf", "virus.exe", "notes.TXT"]),
            &AllowList::default(),
        );

        assert_eq!(accepted_names(&outcome), vec!["report.pdf", "notes.TXT"]);
        assert_eq!(
            outcome.rejected,
            vec![Rejection {
                name: "virus.exe".to_string(),
                reason: UNSUPPORTED_EXTENSION.to_string(),
            }]
        );
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let outcome = validate(files(&["A.PDF", "a.pdf", "a.exe"]), &AllowList::default());
        assert_eq!(accepted_names(&outcome), vec!["A.PDF", "a.pdf"]);
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.rejected[0].name, "a.exe");
    }

    #[test]
    fn names_without_dot_are_rejected() {
        let outcome = validate(files(&["README", "pdf", "docx"]), &AllowList::default());
        assert!(outcome.accepted.is_empty());
        assert!(outcome.rejected.iter().all(|r| r.reason == MISSING_EXTENSION));
    }

    #[test]
    fn only_last_extension_counts() {
        let outcome = validate(
            files(&["archive.pdf.exe", "scan.exe.pdf", "trailing."]),
            &AllowList::default(),
        );
        assert_eq!(accepted_names(&outcome), vec!["scan.exe.pdf"]);
        assert_eq!(outcome.rejected.len(), 2);
    }

    #[test]
    fn every_file_lands_in_exactly_one_partition() {
        let names = [
            "a.pdf", "b.doc", "c.docx", "d.xls", "e.xlsx", "f.txt", "g.png", "h", ".hidden", "i.Xlsx",
        ];
        let outcome = validate(files(&names), &AllowList::default());
        assert_eq!(outcome.accepted.len() + outcome.rejected.len(), names.len());
        for name in names {
            let in_accepted = outcome.accepted.iter().any(|f| f.name == name);
            let in_rejected = outcome.rejected.iter().any(|r| r.name == name);
            assert!(in_accepted ^ in_rejected, "{} must be in exactly one partition", name);
        }
    }

    #[test]
    fn allow_list_normalizes_entries() {
        let list = AllowList::new(["PDF", ".Txt", " docx ", "", ".pdf"]);
        assert_eq!(list.extensions(), &[".pdf", ".txt", ".docx"]);
        assert_eq!(list.describe(), "PDF, TXT, DOCX");
    }

    #[test]
    fn extension_of_takes_last_segment() {
        assert_eq!(extension_of("a.b.PDF").as_deref(), Some(".pdf"));
        assert_eq!(extension_of("noext"), None);
    }
}
