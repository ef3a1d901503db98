//! Operator confirmation before generation

use super::types::Intent;
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Confirmation prompt failed: {0}")]
pub struct ConfirmError(#[from] io::Error);

pub trait Confirmer: Send + Sync {
    /// `true` to proceed with generation
    fn confirm(&self, intent: &Intent) -> Result<bool, ConfirmError>;
}

/// Approves everything (`--yes`)
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoConfirm;

impl Confirmer for AutoConfirm {
    fn confirm(&self, _intent: &Intent) -> Result<bool, ConfirmError> {
        Ok(true)
    }
}

/// Declines everything
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysDecline;

impl Confirmer for AlwaysDecline {
    fn confirm(&self, _intent: &Intent) -> Result<bool, ConfirmError> {
        Ok(false)
    }
}

/// y/N prompt on stderr, answer from stdin. A non-interactive stdin declines.
#[derive(Debug, Clone, Copy)]
pub struct TerminalConfirmer {
    interactive: bool,
}

impl Default for TerminalConfirmer {
    fn default() -> Self {
        Self {
            interactive: atty::is(atty::Stream::Stdin),
        }
    }
}

impl TerminalConfirmer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ask<R: BufRead, W: Write>(
        &self,
        intent: &Intent,
        input: &mut R,
        output: &mut W,
    ) -> Result<bool, ConfirmError> {
        write!(output, "{}", render_intent(intent))?;
        if !self.interactive {
            writeln!(output, "stdin is not a terminal; pass --yes to generate without a prompt")?;
            return Ok(false);
        }

        write!(output, "Generate these artifacts? [y/N] ")?;
        output.flush()?;

        let mut answer = String::new();
        input.read_line(&mut answer)?;
        Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
    }
}

impl Confirmer for TerminalConfirmer {
    fn confirm(&self, intent: &Intent) -> Result<bool, ConfirmError> {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut output = io::stderr();
        self.ask(intent, &mut input, &mut output)
    }
}

pub fn render_intent(intent: &Intent) -> String {
    let mut text = String::new();
    text.push_str(&format!("Intent: {}\n", intent.summary()));
    text.push_str(&format!(
        "  environments: {}\n",
        intent
            .environments()
            .iter()
            .map(|e| e.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    ));
    text.push_str("  components:\n");
    for component in intent.components() {
        text.push_str(&format!(
            "    - {}: {}\n",
            component,
            intent.specification(*component).unwrap_or_default()
        ));
    }
    text.push_str(&format!("  artifact family: {}\n", intent.artifact_family()));
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Analysis;
    use crate::intent::KeywordInterpreter;
    use yare::parameterized;

    fn intent() -> Intent {
        KeywordInterpreter.interpret_goal("prod", &Analysis::empty("x", "/x"))
    }

    #[parameterized(
        yes = { "y\n", true },
        yes_word = { "YES\n", true },
        no = { "n\n", false },
        empty = { "\n", false },
        eof = { "", false },
    )]
    fn test_interactive_answers(answer: &str, expected: bool) {
        let confirmer = TerminalConfirmer { interactive: true };
        let mut input = answer.as_bytes();
        let mut output = Vec::new();
        assert_eq!(confirmer.ask(&intent(), &mut input, &mut output).unwrap(), expected);
        let shown = String::from_utf8(output).unwrap();
        assert!(shown.contains("environments: prod"));
        assert!(shown.contains("[y/N]"));
    }

    #[test]
    fn test_non_interactive_declines() {
        let confirmer = TerminalConfirmer { interactive: false };
        let mut input = "y\n".as_bytes();
        let mut output = Vec::new();
        assert!(!confirmer.ask(&intent(), &mut input, &mut output).unwrap());
    }

    #[test]
    fn test_fixed_confirmers() {
        assert!(AutoConfirm.confirm(&intent()).unwrap());
        assert!(!AlwaysDecline.confirm(&intent()).unwrap());
    }
}
