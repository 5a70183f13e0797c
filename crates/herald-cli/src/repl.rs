//! Line-oriented chat loop

use crate::commands::{self, CommandResult, SuggestCommand};
use herald_chat::{ChatEvent, ConversationController, Phase, Persona, TurnOutcome};
use std::io::{self, IsTerminal, Write};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

/// Renders the events of one turn as plain text
pub struct TurnPrinter<W: Write> {
    out: W,
    is_tty: bool,
    speaker: String,
    streamed: String,
    thinking: bool,
    line_open: bool,
}

impl<W: Write> TurnPrinter<W> {
    pub fn new(out: W, is_tty: bool, speaker: &str) -> Self {
        Self {
            out,
            is_tty,
            speaker: speaker.to_string(),
            streamed: String::new(),
            thinking: false,
            line_open: false,
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }

    pub fn handle(&mut self, event: &ChatEvent) -> io::Result<()> {
        match event {
            ChatEvent::TurnStart { .. } => {
                self.streamed.clear();
            }
            ChatEvent::PhaseChanged { phase } => match phase {
                Phase::AwaitingFirstToken => {
                    // The indicator is rewritten in place, so only on a terminal.
                    if self.is_tty {
                        write!(self.out, "{} is thinking...", self.speaker)?;
                        self.out.flush()?;
                        self.thinking = true;
                    }
                }
                Phase::Streaming | Phase::Idle => {
                    self.clear_thinking()?;
                }
            },
            ChatEvent::BufferUpdated { buffer, .. } => {
                self.catch_up(buffer)?;
            }
            ChatEvent::MessageCommitted { message } => {
                let content = message.content.as_str();
                if !self.streamed.is_empty() && content.starts_with(self.streamed.as_str()) {
                    self.catch_up(content)?;
                } else if content != self.streamed {
                    // Not a continuation of what was streamed: the fallback reply.
                    self.close_line()?;
                    self.write_text(content)?;
                }
            }
            ChatEvent::TurnEnd { outcome } => {
                match outcome {
                    TurnOutcome::Cancelled { .. } => self.note("[stopped]")?,
                    TurnOutcome::Truncated { kept_partial: true } => {
                        self.note("[connection lost]")?
                    }
                    _ => {}
                }
                self.close_line()?;
                self.out.flush()?;
            }
        }
        Ok(())
    }

    /// Print whatever part of `buffer` has not been printed yet.
    ///
    /// Deltas can be missed when the notification channel lags, so output is
    /// driven by the accumulated text. A buffer that is not ahead of what was
    /// already printed is ignored.
    pub fn catch_up(&mut self, buffer: &str) -> io::Result<()> {
        let rest = match buffer.strip_prefix(self.streamed.as_str()) {
            Some(rest) if !rest.is_empty() => rest,
            _ => return Ok(()),
        };
        self.write_text(rest)?;
        self.streamed.push_str(rest);
        Ok(())
    }

    fn write_text(&mut self, text: &str) -> io::Result<()> {
        self.clear_thinking()?;
        if !self.line_open {
            write!(self.out, "{}: ", self.speaker)?;
            self.line_open = true;
        }
        write!(self.out, "{}", text)?;
        self.out.flush()
    }

    fn note(&mut self, text: &str) -> io::Result<()> {
        if self.line_open {
            write!(self.out, " {}", text)
        } else {
            self.line_open = true;
            write!(self.out, "{}", text)
        }
    }

    fn clear_thinking(&mut self) -> io::Result<()> {
        if self.thinking {
            write!(self.out, "\r\x1b[2K")?;
            self.thinking = false;
        }
        Ok(())
    }

    fn close_line(&mut self) -> io::Result<()> {
        if self.line_open {
            writeln!(self.out)?;
            self.line_open = false;
        }
        Ok(())
    }
}

/// Run one turn, printing as it streams. Ctrl-C stops the turn.
pub async fn run_turn<W: Write>(
    controller: &ConversationController,
    text: &str,
    printer: &mut TurnPrinter<W>,
) -> anyhow::Result<TurnOutcome> {
    let mut rx = controller.subscribe();
    let turn = controller.submit(text);
    tokio::pin!(turn);

    let outcome = loop {
        tokio::select! {
            result = &mut turn => break result?,
            event = rx.recv() => match event {
                Ok(event) => printer.handle(&event)?,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "event receiver lagged");
                    printer.catch_up(&controller.pending_buffer())?;
                }
                Err(RecvError::Closed) => {}
            },
            _ = tokio::signal::ctrl_c() => {
                controller.cancel();
            }
        }
    };

    // Events emitted after the last poll of the receiver.
    loop {
        match rx.try_recv() {
            Ok(event) => printer.handle(&event)?,
            Err(TryRecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "event receiver lagged");
            }
            Err(_) => break,
        }
    }

    Ok(outcome)
}

/// Ask a single question and print the answer
pub async fn run_once(
    controller: &ConversationController,
    question: &str,
) -> anyhow::Result<TurnOutcome> {
    let stdout = io::stdout();
    let is_tty = stdout.is_terminal();
    let mut printer = TurnPrinter::new(stdout, is_tty, &controller.persona().name);
    run_turn(controller, question, &mut printer).await
}

/// Interactive mode: read questions and commands from stdin until EOF, /exit or Ctrl-C
pub async fn run_interactive(controller: &ConversationController) -> anyhow::Result<()> {
    let is_tty = io::stdout().is_terminal();
    let persona = controller.persona();

    print_greeting(persona, controller.messages().len() == 1);
    if is_tty {
        println!("Type /help for commands, Ctrl-C to stop an answer.\n");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        };
        let Some(line) = line else {
            break;
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let question = match commands::execute_command(input, controller) {
            Some(CommandResult::Exit) => break,
            Some(CommandResult::Clear) => {
                match controller.reset() {
                    Ok(()) => {
                        println!("Conversation cleared.\n");
                        print_greeting(persona, true);
                    }
                    Err(e) => eprintln!("Error: {}", e),
                }
                continue;
            }
            Some(CommandResult::Message(msg)) => {
                println!("{}\n", msg);
                continue;
            }
            Some(CommandResult::Unknown(cmd)) => {
                println!("Unknown command: /{}. Type /help for available commands.\n", cmd);
                continue;
            }
            Some(CommandResult::Ask(question)) => {
                println!("> {}", question);
                question
            }
            None => input.to_string(),
        };

        let mut printer = TurnPrinter::new(io::stdout(), is_tty, &persona.name);
        if let Err(e) = run_turn(controller, &question, &mut printer).await {
            eprintln!("Error: {}", e);
        }
        println!();
    }

    Ok(())
}

fn print_greeting(persona: &Persona, with_suggestions: bool) {
    match &persona.title {
        Some(title) => println!("{} ({})", persona.name, title),
        None => println!("{}", persona.name),
    }
    println!("{}\n", persona.greeting);
    if with_suggestions && !persona.suggestions.is_empty() {
        println!("{}\n", SuggestCommand::list_text(persona));
    }
}
