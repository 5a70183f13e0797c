//! Slash commands for interactive mode

mod history;
mod suggest;

use history::HistoryCommand;
pub use suggest::SuggestCommand;

use herald_chat::ConversationController;

/// Result of executing a slash command
#[derive(Debug, PartialEq, Eq)]
pub enum CommandResult {
    /// Reset the conversation to the greeting
    Clear,
    /// Show a message to the user (not sent upstream)
    Message(String),
    /// Submit this text as if the user had typed it
    Ask(String),
    /// Exit the application
    Exit,
    /// Unknown command
    Unknown(String),
}

/// Parse and execute a slash command
pub fn execute_command(input: &str, controller: &ConversationController) -> Option<CommandResult> {
    let input = input.trim();

    let rest = input.strip_prefix('/')?;
    let parts: Vec<&str> = rest.splitn(2, ' ').collect();
    let command = parts[0].to_lowercase();
    let args = parts.get(1).map(|s| s.trim()).unwrap_or("");

    Some(match command.as_str() {
        "help" | "h" | "?" => CommandResult::Message(help_message()),

        "clear" | "c" => CommandResult::Clear,

        "quit" | "exit" | "q" => CommandResult::Exit,

        "suggest" | "s" => SuggestCommand::list(controller.persona()),

        "ask" | "a" => SuggestCommand::ask(args, controller.persona()),

        "history" => HistoryCommand::execute(&controller.messages(), controller.persona()),

        _ => CommandResult::Unknown(command),
    })
}

fn help_message() -> String {
    r#"Available commands:
  /help, /h, /?        Show this help message
  /suggest, /s         List suggested questions
  /ask, /a <n>         Ask suggested question number n
  /history             Show the conversation so far
  /clear, /c           Start a fresh conversation
  /quit, /exit, /q     Exit herald

While an answer is streaming, press Ctrl-C to stop it; the partial answer is kept."#
        .to_string()
}
