//! Small HCL text helpers

/// A top-level block with `=`-aligned attribute groups separated by blank lines
pub struct Block {
    header: String,
    groups: Vec<Vec<(String, String)>>,
    raw: Vec<String>,
}

impl Block {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            groups: Vec::new(),
            raw: Vec::new(),
        }
    }

    pub fn group<K: Into<String>>(mut self, attrs: impl IntoIterator<Item = (K, String)>) -> Self {
        let attrs: Vec<(String, String)> = attrs.into_iter().map(|(k, v)| (k.into(), v)).collect();
        if !attrs.is_empty() {
            self.groups.push(attrs);
        }
        self
    }

    pub fn attr(self, key: &str, value: String) -> Self {
        self.group([(key, value)])
    }

    /// Pre-formatted nested text, indented one level
    pub fn nested(mut self, text: &str) -> Self {
        self.raw.push(text.to_string());
        self
    }

    pub fn render(&self) -> String {
        let mut chunks: Vec<String> = Vec::new();
        for group in &self.groups {
            let width = group.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
            let lines: Vec<String> = group
                .iter()
                .map(|(k, v)| format!("  {:width$} = {}", k, v, width = width))
                .collect();
            chunks.push(lines.join("\n"));
        }
        for text in &self.raw {
            let indented: Vec<String> = text
                .lines()
                .map(|l| if l.is_empty() { String::new() } else { format!("  {}", l) })
                .collect();
            chunks.push(indented.join("\n"));
        }

        if chunks.is_empty() {
            format!("{} {{}}", self.header)
        } else {
            format!("{} {{\n{}\n}}", self.header, chunks.join("\n\n"))
        }
    }
}

pub fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Object literal with aligned keys, for maps like tags
pub fn map(entries: &[(&str, String)], indent: usize) -> String {
    let width = entries.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    let pad = " ".repeat(indent);
    let lines: Vec<String> = entries
        .iter()
        .map(|(k, v)| format!("{}  {:width$} = {}", pad, k, v, width = width))
        .collect();
    format!("{{\n{}\n{}}}", lines.join("\n"), pad)
}

/// Valid Terraform identifier from arbitrary text
pub fn identifier(raw: &str) -> String {
    let mut id: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    if id.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(true) {
        id.insert(0, 'r');
        id.insert(1, '_');
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_alignment() {
        let block = Block::new("module \"network\"")
            .attr("source", quote("../../modules/network"))
            .group([("name", "local.name".to_string()), ("cidr_block", "var.vpc_cidr".to_string())]);

        assert_eq!(
            block.render(),
            "module \"network\" {\n  source = \"../../modules/network\"\n\n  name       = local.name\n  cidr_block = var.vpc_cidr\n}"
        );
    }

    #[test]
    fn test_nested_and_empty() {
        assert_eq!(Block::new("data \"aws_region\" \"current\"").render(), "data \"aws_region\" \"current\" {}");
        let block = Block::new("terraform").nested("backend \"local\" {}");
        assert_eq!(block.render(), "terraform {\n  backend \"local\" {}\n}");
    }

    #[test]
    fn test_identifier() {
        assert_eq!(identifier("i-0abc"), "i_0abc");
        assert_eq!(identifier("123-db"), "r_123_db");
        assert_eq!(identifier(""), "r_");
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote("a\"b"), "\"a\\\"b\"");
    }
}
