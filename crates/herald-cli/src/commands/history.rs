//! /history command

use super::CommandResult;
use crate::utils::truncate_chars;
use herald_chat::{Message, Persona, Role};

pub struct HistoryCommand;

impl HistoryCommand {
    pub fn execute(messages: &[Message], persona: &Persona) -> CommandResult {
        CommandResult::Message(Self::format(messages, persona))
    }

    fn format(messages: &[Message], persona: &Persona) -> String {
        let mut output = format!("Conversation ({} messages):\n", messages.len());
        for (i, msg) in messages.iter().enumerate() {
            let speaker = match msg.role {
                Role::User => "You",
                Role::Assistant => persona.name.as_str(),
            };
            let preview = truncate_chars(&msg.content, 60).replace('\n', " ");
            output.push_str(&format!(
                "  {}: [{} {}] {}\n",
                i,
                msg.timestamp.format("%H:%M:%S"),
                speaker,
                preview
            ));
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_chat::PromptTemplate;

    #[test]
    fn test_format_lists_speakers() {
        let persona = Persona {
            name: "Napoleon".into(),
            title: None,
            greeting: "Bonjour".into(),
            template: PromptTemplate::new("{question}"),
            fallback: "Pardonnez-moi".into(),
            suggestions: vec![],
        };
        let messages = vec![
            Message::greeting("Bonjour\nmes amis"),
            Message::user("Wie bent u?"),
        ];
        let text = HistoryCommand::format(&messages, &persona);
        assert!(text.starts_with("Conversation (2 messages):"));
        assert!(text.contains("Napoleon] Bonjour mes amis"));
        assert!(text.contains("You] Wie bent u?"));
    }
}
