//! Line-oriented chat loop.

use filings_chat::{AskOutcome, Conversation, ConversationTurn};
use filings_core::{AppError, AppResult};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};

const PROMPT: &str = ">> ";
const COMMANDS: &[&str] = &["/clear", "/history", "/help", "/exit", "/quit"];

/// One line of user input, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Question(String),
    Clear,
    History,
    Help,
    Exit,
    Unknown(String),
    Empty,
}

pub fn parse_input(line: &str) -> Input {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Input::Empty;
    }
    if !trimmed.starts_with('/') {
        return Input::Question(trimmed.to_string());
    }

    match trimmed {
        "/clear" => Input::Clear,
        "/history" => Input::History,
        "/help" => Input::Help,
        "/exit" | "/quit" => Input::Exit,
        other => Input::Unknown(other.to_string()),
    }
}

#[derive(Clone)]
struct ChatHelper;

impl Helper for ChatHelper {}

impl Completer for ChatHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];
        if !line.starts_with('/') {
            return Ok((0, vec![]));
        }

        let candidates = COMMANDS
            .iter()
            .filter(|cmd| cmd.starts_with(line))
            .map(|cmd| Pair {
                display: cmd.to_string(),
                replacement: cmd.to_string(),
            })
            .collect();
        Ok((0, candidates))
    }
}

impl Hinter for ChatHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];
        if !line.starts_with('/') || line.contains(' ') {
            return None;
        }
        COMMANDS
            .iter()
            .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
            .map(|cmd| cmd[line.len()..].to_string())
    }
}

impl Highlighter for ChatHelper {}

impl Validator for ChatHelper {}

/// Read questions until the user leaves.
pub async fn run(mut conversation: Conversation) -> AppResult<()> {
    let mut rl = Editor::new().map_err(readline_error)?;
    rl.set_helper(Some(ChatHelper));

    print_help();

    loop {
        let line = match rl.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("Type /exit or press Ctrl-D to leave.");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(readline_error(e)),
        };

        let input = parse_input(&line);
        if let Input::Question(_) = input {
            let _ = rl.add_history_entry(line.as_str());
        }

        match input {
            Input::Empty => {}
            Input::Question(question) => {
                eprintln!("Assistant is thinking...");
                match conversation.ask(&question).await {
                    AskOutcome::Answered(turn) => print_turn(&turn),
                    AskOutcome::Failed(turn) => {
                        tracing::warn!("Answer failed for: {}", turn.user_text);
                        print_turn(&turn);
                    }
                    AskOutcome::Rejected(reason) => eprintln!("{}", reason),
                }
            }
            Input::Clear => {
                conversation.clear();
                println!("Conversation cleared.");
            }
            Input::History => {
                let history = conversation.state().history();
                if history.is_empty() {
                    println!("No questions asked yet.");
                }
                for turn in history {
                    print_turn(turn);
                }
            }
            Input::Help => print_help(),
            Input::Exit => break,
            Input::Unknown(cmd) => println!("Unknown command: {} (try /help)", cmd),
        }
    }

    println!("Goodbye.");
    Ok(())
}

fn print_turn(turn: &ConversationTurn) {
    println!();
    println!("You: {}", turn.user_text);
    println!();
    println!("Assistant: {}", turn.bot_text);
    println!();
}

fn print_help() {
    println!("Ask a question about the selected filings.");
    println!("Commands: /clear  /history  /help  /exit");
    println!();
}

fn readline_error(e: ReadlineError) -> AppError {
    AppError::Io(std::io::Error::other(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_question_is_trimmed() {
        assert_eq!(
            parse_input("  What was revenue?  \n"),
            Input::Question("What was revenue?".to_string())
        );
    }

    #[test]
    fn test_parse_blank_is_empty() {
        assert_eq!(parse_input("   "), Input::Empty);
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_input("/clear"), Input::Clear);
        assert_eq!(parse_input("/history"), Input::History);
        assert_eq!(parse_input(" /help "), Input::Help);
        assert_eq!(parse_input("/exit"), Input::Exit);
        assert_eq!(parse_input("/quit"), Input::Exit);
    }

    #[test]
    fn test_parse_unknown_command() {
        assert_eq!(parse_input("/reset"), Input::Unknown("/reset".to_string()));
    }
}
