//! Chat command handler.
//!
//! Reads questions from stdin, one per line, keeping conversation history so
//! follow-ups can refer to earlier turns.

use super::{open_pipeline, render_answer};
use clap::Args;
use docscout_core::{config::AppConfig, error::user_facing_message, AppResult};
use docscout_knowledge::{Mode, Session};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "Commands: /undo, /mode <document_search|inquiry>, /reset, /quit";

/// Interactive multi-turn session
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Starting mode (document_search or inquiry)
    #[arg(long, default_value = "document_search")]
    pub mode: Mode,
}

/// What a line of input asks the session to do.
#[derive(Debug, PartialEq)]
enum Input<'a> {
    Question(&'a str),
    Undo,
    SetMode(Result<Mode, String>),
    Reset,
    Help,
    Quit,
    Empty,
}

fn parse_input(line: &str) -> Input<'_> {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }

    let Some(command) = line.strip_prefix('/') else {
        return Input::Question(line);
    };

    let (name, arg) = command.split_once(' ').unwrap_or((command, ""));
    match name {
        "undo" => Input::Undo,
        "mode" => Input::SetMode(arg.parse()),
        "reset" => Input::Reset,
        "quit" | "exit" => Input::Quit,
        _ => Input::Help,
    }
}

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing chat command");

        let pipeline = open_pipeline(config).await?;
        let mut session = Session::new(self.mode);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        eprintln!("{}", HELP);

        loop {
            print!("[{}] > ", session.mode);
            std::io::stdout().flush().ok();

            let Some(line) = lines.next_line().await? else {
                break;
            };

            match parse_input(&line) {
                Input::Empty => {}
                Input::Quit => break,
                Input::Help => eprintln!("{}", HELP),
                Input::Reset => session = Session::new(session.mode),
                Input::SetMode(Ok(mode)) => session.mode = mode,
                Input::SetMode(Err(e)) => eprintln!("{}", e),
                Input::Undo => {
                    let (next, undone) = session.undo();
                    session = next;
                    if !undone {
                        eprintln!("Nothing to undo.");
                    }
                }
                Input::Question(question) => {
                    match pipeline.turn(session.clone(), question).await {
                        Ok((next, answer)) => {
                            session = next;
                            println!("{}\n", render_answer(&answer));
                        }
                        Err(e) => {
                            tracing::error!("Turn failed: {}", e);
                            eprintln!("{}", user_facing_message(&e.to_string()));
                        }
                    }
                }
            }
        }

        tracing::debug!("Chat ended after {} turns", session.history.len() / 2);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input() {
        assert_eq!(parse_input("  "), Input::Empty);
        assert_eq!(parse_input("where is the roster?"), Input::Question("where is the roster?"));
        assert_eq!(parse_input("/undo"), Input::Undo);
        assert_eq!(parse_input("/exit"), Input::Quit);
        assert_eq!(parse_input("/mode inquiry"), Input::SetMode(Ok(Mode::Inquiry)));
        assert!(matches!(parse_input("/mode nope"), Input::SetMode(Err(_))));
        assert_eq!(parse_input("/what"), Input::Help);
    }
}
