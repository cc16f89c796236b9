//! User interaction capability
//!
//! Confirmations and prompts go through this trait so the command layer can
//! run against a scripted implementation in tests and non-interactive
//! environments. Prompt rendering stays deliberately plain.

use crate::error::{Result, TpkmError};
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

pub trait Ui {
    /// Ask a yes/no question; only an explicit yes returns true
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
    /// Read one line of input
    fn prompt_line(&mut self, prompt: &str) -> Result<String>;
    /// Read a password
    fn prompt_password(&mut self, prompt: &str) -> Result<String>;
}

/// Stdin/stderr implementation used by the binary
pub struct ConsoleUi;

impl ConsoleUi {
    fn read_line(&self, prompt: &str) -> Result<String> {
        eprint!("{prompt}");
        io::stderr()
            .flush()
            .map_err(|e| TpkmError::Io(e.to_string()))?;
        let mut line = String::new();
        io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|e| TpkmError::Io(format!("cannot read input: {e}")))?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

impl Ui for ConsoleUi {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        let answer = self.read_line(&format!("{prompt} [y/N] "))?;
        Ok(matches!(answer.to_lowercase().as_str(), "y" | "yes"))
    }

    fn prompt_line(&mut self, prompt: &str) -> Result<String> {
        self.read_line(&format!("{prompt}: "))
    }

    fn prompt_password(&mut self, prompt: &str) -> Result<String> {
        self.read_line(&format!("{prompt}: "))
    }
}

/// Scripted implementation: answers come from a queue, prompts are recorded
pub struct ScriptedUi {
    answers: VecDeque<String>,
    pub prompts: Vec<String>,
}

impl ScriptedUi {
    pub fn new<S: Into<String>>(answers: Vec<S>) -> ScriptedUi {
        ScriptedUi {
            answers: answers.into_iter().map(Into::into).collect(),
            prompts: Vec::new(),
        }
    }

    fn next(&mut self, prompt: &str) -> Result<String> {
        self.prompts.push(prompt.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| TpkmError::Unknown(format!("no scripted answer for prompt {prompt:?}")))
    }
}

impl Ui for ScriptedUi {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        let answer = self.next(prompt)?;
        Ok(matches!(answer.to_lowercase().as_str(), "y" | "yes"))
    }

    fn prompt_line(&mut self, prompt: &str) -> Result<String> {
        self.next(prompt)
    }

    fn prompt_password(&mut self, prompt: &str) -> Result<String> {
        self.next(prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_answers_in_order() {
        let mut ui = ScriptedUi::new(vec!["yes", "secret", "exact-name"]);
        assert!(ui.confirm("overwrite?").unwrap());
        assert_eq!(ui.prompt_password("password").unwrap(), "secret");
        assert_eq!(ui.prompt_line("type the name").unwrap(), "exact-name");
        assert_eq!(ui.prompts.len(), 3);
    }

    #[test]
    fn scripted_runs_dry() {
        let mut ui = ScriptedUi::new(Vec::<String>::new());
        assert!(ui.confirm("anything?").is_err());
    }

    #[test]
    fn only_explicit_yes_confirms() {
        let mut ui = ScriptedUi::new(vec!["", "no", "Y", "YES"]);
        assert!(!ui.confirm("a").unwrap());
        assert!(!ui.confirm("b").unwrap());
        assert!(ui.confirm("c").unwrap());
        assert!(ui.confirm("d").unwrap());
    }
}
