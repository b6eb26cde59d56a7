//! Interactive prompts for unset flags and arguments

use crate::config::types::{Prompt, PromptKind};
use crate::error::PromptError;
use crate::runner::vars::Value;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Editor, Input, MultiSelect, Password, Select};

/// Asks the user for a parameter value
pub trait Prompter {
    /// `confirm` yields a boolean, `multi_select` a list and every other kind a string
    fn ask(&self, kind: PromptKind, prompt: &Prompt) -> Result<Value, PromptError>;
}

/// Prompts on the controlling terminal
#[derive(Default)]
pub struct TerminalPrompter {
    theme: ColorfulTheme,
}

impl TerminalPrompter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Prompter for TerminalPrompter {
    fn ask(&self, kind: PromptKind, prompt: &Prompt) -> Result<Value, PromptError> {
        let message = prompt_message(prompt);

        let value = match kind {
            PromptKind::Input => Value::String(
                Input::<String>::with_theme(&self.theme)
                    .with_prompt(message)
                    .allow_empty(true)
                    .interact_text()?,
            ),
            PromptKind::Multiline => Value::String(self.ask_lines(&message)?),
            PromptKind::Password => Value::String(
                Password::with_theme(&self.theme)
                    .with_prompt(message)
                    .allow_empty_password(true)
                    .interact()?,
            ),
            PromptKind::Confirm => Value::Bool(
                Confirm::with_theme(&self.theme)
                    .with_prompt(message)
                    .default(false)
                    .interact()?,
            ),
            PromptKind::Select => {
                if prompt.options.is_empty() {
                    return Err(PromptError::NoOptions);
                }
                let index = Select::with_theme(&self.theme)
                    .with_prompt(message)
                    .items(&prompt.options)
                    .default(0)
                    .interact_opt()?
                    .ok_or(PromptError::Cancelled)?;
                Value::String(prompt.options[index].clone())
            }
            PromptKind::MultiSelect => {
                if prompt.options.is_empty() {
                    return Err(PromptError::NoOptions);
                }
                let indices = MultiSelect::with_theme(&self.theme)
                    .with_prompt(message)
                    .items(&prompt.options)
                    .interact_opt()?
                    .ok_or(PromptError::Cancelled)?;
                Value::List(
                    indices
                        .into_iter()
                        .map(|i| prompt.options[i].clone())
                        .collect(),
                )
            }
            PromptKind::Editor => {
                eprintln!("{}", message);
                Value::String(Editor::new().edit("")?.unwrap_or_default())
            }
        };

        Ok(value)
    }
}

impl TerminalPrompter {
    /// Read lines until an empty one
    fn ask_lines(&self, message: &str) -> Result<String, PromptError> {
        eprintln!("{} (finish with an empty line)", message);
        let mut lines = Vec::new();
        loop {
            let line = Input::<String>::with_theme(&self.theme)
                .with_prompt(">")
                .allow_empty(true)
                .interact_text()?;
            if line.is_empty() {
                break;
            }
            lines.push(line);
        }
        Ok(lines.join("\n"))
    }
}

fn prompt_message(prompt: &Prompt) -> String {
    if prompt.help.is_empty() {
        prompt.message.clone()
    } else {
        format!("{} ({})", prompt.message, prompt.help)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_message_with_help() {
        let prompt = Prompt {
            prompt_type: "input".to_string(),
            message: "Target".to_string(),
            help: "the deployment target".to_string(),
            ..Prompt::default()
        };
        assert_eq!(prompt_message(&prompt), "Target (the deployment target)");

        let prompt = Prompt {
            message: "Target".to_string(),
            ..Prompt::default()
        };
        assert_eq!(prompt_message(&prompt), "Target");
    }

    #[test]
    fn test_select_without_options_fails() {
        let prompt = Prompt {
            prompt_type: "select".to_string(),
            message: "env".to_string(),
            ..Prompt::default()
        };
        let result = TerminalPrompter::new().ask(PromptKind::Select, &prompt);
        assert!(matches!(result, Err(PromptError::NoOptions)));
    }
}
