//! /suggest and /ask commands

use super::CommandResult;
use herald_chat::Persona;

pub struct SuggestCommand;

impl SuggestCommand {
    /// List the persona's suggested questions
    pub fn list(persona: &Persona) -> CommandResult {
        if persona.suggestions.is_empty() {
            return CommandResult::Message(format!("{} has no suggested questions.", persona.name));
        }
        CommandResult::Message(Self::list_text(persona))
    }

    /// Numbered list of suggestions
    pub fn list_text(persona: &Persona) -> String {
        let mut output = String::from("Suggested questions:\n");
        for (i, question) in persona.suggestions.iter().enumerate() {
            output.push_str(&format!("  {}. \"{}\"\n", i + 1, question));
        }
        output.push_str("\nUse /ask <n> to ask one.");
        output
    }

    /// Resolve `/ask <n>` to the question text
    pub fn ask(args: &str, persona: &Persona) -> CommandResult {
        if args.is_empty() {
            return CommandResult::Message("Usage: /ask <n> (see /suggest)".to_string());
        }

        match args.parse::<usize>() {
            Ok(n) => match persona.suggestion(n) {
                Some(question) => CommandResult::Ask(question.to_string()),
                None => CommandResult::Message(format!(
                    "No suggestion {}. Choose 1-{}.",
                    n,
                    persona.suggestions.len()
                )),
            },
            Err(_) => CommandResult::Message(format!("Not a number: {}", args)),
        }
    }
}
