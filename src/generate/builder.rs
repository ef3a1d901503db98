//! Section-based text assembly for generated files

use super::artifact::GenerateError;
use super::family::ArtifactFamily;
use serde::Serialize;

/// Text every provenance line carries after its comment marker
pub const PROVENANCE_TEXT: &str = "Generated by infrakit at";

const COMMENT_MARKERS: &[&str] = &["#", "//", "--"];

/// True for lines like `# Generated by infrakit at 2024-01-01T00:00:00Z`
pub fn is_provenance_line(line: &str) -> bool {
    let line = line.trim_start();
    COMMENT_MARKERS.iter().any(|marker| {
        line.strip_prefix(marker)
            .map(|rest| rest.trim_start().starts_with(PROVENANCE_TEXT))
            .unwrap_or(false)
    })
}

/// Content with provenance lines removed, for change detection
pub fn strip_provenance(content: &str) -> String {
    content
        .lines()
        .filter(|line| !is_provenance_line(line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// YAML body for a section, without the leading document marker
pub fn yaml<T: Serialize>(family: ArtifactFamily, path: &str, value: &T) -> Result<String, GenerateError> {
    let text = serde_yaml::to_string(value).map_err(|e| GenerateError::Render {
        family,
        path: path.to_string(),
        message: e.to_string(),
    })?;
    Ok(text.trim_start_matches("---\n").to_string())
}

pub fn json<T: Serialize>(family: ArtifactFamily, path: &str, value: &T) -> Result<String, GenerateError> {
    serde_json::to_string_pretty(value).map_err(|e| GenerateError::Render {
        family,
        path: path.to_string(),
        message: e.to_string(),
    })
}

#[derive(Debug, Clone)]
struct Section {
    name: String,
    body: String,
    enabled: bool,
}

/// An ordered list of named sections, each of which can be switched off,
/// plus at most one provenance line at the top.
#[derive(Debug, Clone)]
pub struct Document {
    comment: Option<&'static str>,
    provenance: Option<String>,
    sections: Vec<Section>,
}

impl Document {
    /// A document whose comments start with `marker`
    pub fn new(marker: &'static str) -> Self {
        Self {
            comment: Some(marker),
            provenance: None,
            sections: Vec::new(),
        }
    }

    /// HCL, YAML, Dockerfile, Rego
    pub fn hash_commented() -> Self {
        Self::new("#")
    }

    /// Formats without comments (JSON). Provenance is never written.
    pub fn uncommented() -> Self {
        Self {
            comment: None,
            provenance: None,
            sections: Vec::new(),
        }
    }

    pub fn provenance(mut self, generated_at: &str) -> Self {
        if let Some(marker) = self.comment {
            self.provenance = Some(format!("{} {} {}", marker, PROVENANCE_TEXT, generated_at));
        }
        self
    }

    pub fn section(self, name: impl Into<String>, body: impl Into<String>) -> Self {
        self.section_if(name, true, body)
    }

    pub fn section_if(mut self, name: impl Into<String>, enabled: bool, body: impl Into<String>) -> Self {
        self.sections.push(Section {
            name: name.into(),
            body: body.into(),
            enabled,
        });
        self
    }

    /// `# text` line as its own section
    pub fn comment_section(self, name: impl Into<String>, text: &str) -> Self {
        let body = match self.comment {
            Some(marker) => text
                .lines()
                .map(|l| format!("{} {}", marker, l).trim_end().to_string())
                .collect::<Vec<_>>()
                .join("\n"),
            None => String::new(),
        };
        let enabled = self.comment.is_some();
        self.section_if(name, enabled, body)
    }

    pub fn disable(mut self, name: &str) -> Self {
        for section in self.sections.iter_mut().filter(|s| s.name == name) {
            section.enabled = false;
        }
        self
    }

    pub fn section_names(&self) -> Vec<&str> {
        self.sections
            .iter()
            .filter(|s| s.enabled)
            .map(|s| s.name.as_str())
            .collect()
    }

    /// Sections joined by a blank line, newline-terminated
    pub fn render(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if let Some(line) = &self.provenance {
            parts.push(line);
        }
        for section in self.sections.iter().filter(|s| s.enabled) {
            let body = section.body.trim_end_matches('\n');
            if !body.is_empty() {
                parts.push(body);
            }
        }

        let mut out = String::new();
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                // the provenance line sits directly above the first section
                out.push_str(if i == 1 && self.provenance.is_some() { "\n" } else { "\n\n" });
            }
            out.push_str(part);
        }
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_sections_in_order() {
        let doc = Document::hash_commented()
            .provenance("2024-01-01T00:00:00Z")
            .section("header", "a = 1")
            .section_if("optional", false, "b = 2")
            .section("footer", "c = 3\n");

        assert_eq!(
            doc.render(),
            "# Generated by infrakit at 2024-01-01T00:00:00Z\na = 1\n\nc = 3\n"
        );
        assert_eq!(doc.section_names(), vec!["header", "footer"]);
    }

    #[test]
    fn test_disable_section() {
        let doc = Document::hash_commented()
            .section("one", "1")
            .section("two", "2")
            .disable("one");
        assert_eq!(doc.render(), "2\n");
    }

    #[test]
    fn test_uncommented_has_no_provenance() {
        let doc = Document::uncommented().provenance("now").section("body", "{}");
        assert_eq!(doc.render(), "{}\n");
    }

    #[test]
    fn test_comment_section() {
        let doc = Document::new("//").comment_section("note", "line one\n\nline two");
        assert_eq!(doc.render(), "// line one\n//\n// line two\n");
    }

    #[test]
    fn test_provenance_detection() {
        assert!(is_provenance_line("# Generated by infrakit at 2024"));
        assert!(is_provenance_line("  // Generated by infrakit at x"));
        assert!(!is_provenance_line("# Generated by hand"));
        assert!(!is_provenance_line("Generated by infrakit at"));

        let a = "# Generated by infrakit at 1\nbody\n";
        let b = "# Generated by infrakit at 2\nbody\n";
        assert_eq!(strip_provenance(a), strip_provenance(b));
    }
}
