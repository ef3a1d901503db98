//! Structured-block extraction from recommendation text

use super::types::{Component, Environment, Intent};
use super::InterpretError;
use crate::generate::ArtifactFamily;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct RawIntent {
    #[serde(default)]
    environments: Vec<String>,
    #[serde(default)]
    components: Vec<String>,
    #[serde(default)]
    specifications: BTreeMap<String, String>,
    #[serde(alias = "artifactFamily", alias = "family")]
    artifact_family: Option<String>,
    #[serde(default)]
    summary: String,
}

/// The first balanced `{ ... }` block, ignoring braces inside JSON strings
pub fn extract_first_block(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

fn parse_all<T: std::str::FromStr<Err = String>>(
    field: &'static str,
    values: &[String],
) -> Result<Vec<T>, InterpretError> {
    values
        .iter()
        .map(|v| {
            v.parse::<T>().map_err(|_| InterpretError::InvalidValue {
                field,
                value: v.clone(),
            })
        })
        .collect()
}

/// Validates a recommendation response into an [`Intent`]
pub fn parse_intent(response: &str) -> Result<Intent, InterpretError> {
    let block = extract_first_block(response).ok_or(InterpretError::NoStructuredBlock)?;
    debug!(chars = block.len(), "Extracted structured block");

    let raw: RawIntent = serde_json::from_str(block)
        .map_err(|e| InterpretError::MalformedBlock(e.to_string()))?;

    let environments: Vec<Environment> = parse_all("environments", &raw.environments)?;
    let components: Vec<Component> = parse_all("components", &raw.components)?;

    let family_text = raw
        .artifact_family
        .ok_or(InterpretError::MissingField("artifact_family"))?;
    let family: ArtifactFamily =
        family_text
            .parse()
            .map_err(|_| InterpretError::InvalidValue {
                field: "artifact_family",
                value: family_text.clone(),
            })?;

    let mut specifications = BTreeMap::new();
    for (key, text) in raw.specifications {
        let component: Component = key.parse().map_err(|_| InterpretError::InvalidValue {
            field: "specifications",
            value: key.clone(),
        })?;
        specifications.insert(component, text);
    }

    Ok(Intent::new(
        environments,
        components,
        specifications,
        family,
        raw.summary,
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_plain_and_fenced() {
        assert_eq!(extract_first_block(r#"{"a": 1}"#), Some(r#"{"a": 1}"#));
        let fenced = "Here you go:\n```json\n{\"a\": {\"b\": 2}}\n```\nThanks";
        assert_eq!(extract_first_block(fenced), Some("{\"a\": {\"b\": 2}}"));
    }

    #[test]
    fn test_extract_ignores_braces_in_strings() {
        let text = r#"{"summary": "use {curly} braces", "x": "\"}"} trailing"#;
        assert_eq!(
            extract_first_block(text),
            Some(r#"{"summary": "use {curly} braces", "x": "\"}"}"#)
        );
    }

    #[test]
    fn test_first_of_two_blocks_wins() {
        let text = r#"{"environments": ["dev"]} or maybe {"environments": ["prod"]}"#;
        assert_eq!(extract_first_block(text), Some(r#"{"environments": ["dev"]}"#));
    }

    #[test]
    fn test_extract_unbalanced() {
        assert_eq!(extract_first_block("{\"a\": 1"), None);
        assert_eq!(extract_first_block("no json here"), None);
    }

    #[test]
    fn test_parse_valid_intent() {
        let intent = parse_intent(
            r#"Sure. {"environments": ["prod", "dev"], "components": ["database", "compute"],
               "specifications": {"database": "postgres 16, multi-AZ in prod"},
               "artifact_family": "provisioning", "summary": "Two envs with Postgres"}"#,
        )
        .unwrap();
        assert_eq!(intent.environments(), &[Environment::Dev, Environment::Prod]);
        assert_eq!(intent.components(), &[Component::Compute, Component::Database]);
        assert_eq!(
            intent.specification(Component::Database),
            Some("postgres 16, multi-AZ in prod")
        );
        assert_eq!(intent.summary(), "Two envs with Postgres");
    }

    #[test]
    fn test_parse_failures() {
        assert!(matches!(
            parse_intent("I think you want Terraform."),
            Err(InterpretError::NoStructuredBlock)
        ));
        assert!(matches!(
            parse_intent("{environments: dev}"),
            Err(InterpretError::MalformedBlock(_))
        ));
        assert!(matches!(
            parse_intent(r#"{"environments": ["qa"], "components": ["compute"], "artifact_family": "ci"}"#),
            Err(InterpretError::InvalidValue { field: "environments", .. })
        ));
        assert!(matches!(
            parse_intent(r#"{"environments": [], "components": ["compute"], "artifact_family": "ci"}"#),
            Err(InterpretError::Intent(_))
        ));
        assert!(matches!(
            parse_intent(r#"{"environments": ["dev"], "components": ["compute"]}"#),
            Err(InterpretError::MissingField("artifact_family"))
        ));
    }
}
