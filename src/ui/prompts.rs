//! Interactive prompts.

use console::Term;
use dialoguer::{Confirm, Input};

use crate::error::{ForgeError, Result};

use super::{Prompt, PromptResult, PromptType};

/// Convert dialoguer errors to ForgeError.
fn map_dialoguer_err(e: dialoguer::Error) -> ForgeError {
    ForgeError::Io(e.into())
}

/// Prompt the user for input.
pub fn prompt_user(prompt: &Prompt, term: &Term) -> Result<PromptResult> {
    match &prompt.prompt_type {
        PromptType::Confirm => prompt_confirm(prompt, term),
        PromptType::Input => prompt_input(prompt, term),
    }
}

/// Interpret a default string as a confirm answer.
pub(crate) fn parse_confirm(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "y" | "yes" | "1")
}

fn prompt_confirm(prompt: &Prompt, term: &Term) -> Result<PromptResult> {
    let default = prompt.default.as_deref().map(parse_confirm).unwrap_or(false);

    let result = Confirm::new()
        .with_prompt(&prompt.question)
        .default(default)
        .interact_on(term)
        .map_err(map_dialoguer_err)?;

    Ok(PromptResult::Bool(result))
}

fn prompt_input(prompt: &Prompt, term: &Term) -> Result<PromptResult> {
    let input = Input::<String>::new().with_prompt(&prompt.question);

    let result: String = if let Some(default) = &prompt.default {
        input
            .default(default.clone())
            .interact_on(term)
            .map_err(map_dialoguer_err)?
    } else {
        input.interact_on(term).map_err(map_dialoguer_err)?
    };

    Ok(PromptResult::String(result.trim().to_string()))
}
