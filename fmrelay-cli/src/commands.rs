use std::str::FromStr;

use relay_engine::StreamController;
use tracing::{error, info};

use crate::error::AppError;

pub const HELP: &str = "\
Commands:
  play <url>   relay the stream at <url>
  stop         stop the current stream
  status       show what is playing
  help         show this help
  quit         stop and exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Play(String),
    Stop,
    Status,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = AppError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (name, rest) = line
            .split_once(char::is_whitespace)
            .map(|(name, rest)| (name, rest.trim()))
            .unwrap_or((line, ""));

        match (name.to_ascii_lowercase().as_str(), rest) {
            ("play" | "p", "") => Err(AppError::InvalidInput("play needs a URL".into())),
            ("play" | "p", url) => Ok(Self::Play(url.to_owned())),
            ("stop" | "s", "") => Ok(Self::Stop),
            ("status", "") => Ok(Self::Status),
            ("help" | "?", "") => Ok(Self::Help),
            ("quit" | "exit" | "q", "") => Ok(Self::Quit),
            _ => Err(AppError::InvalidInput(format!(
                "unknown command `{line}`, type `help`"
            ))),
        }
    }
}

/// Whether the command loop should keep reading input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Run one command against the controller, returning the text to show.
pub async fn execute(controller: &StreamController, command: Command) -> (Flow, String) {
    match command {
        Command::Play(url) => match controller.play(&url).await {
            Ok(()) => {
                info!(url = %url, "Play requested");
                (Flow::Continue, format!("Playing {url}"))
            }
            Err(e) => {
                error!(url = %url, error = %e, "Play failed");
                (Flow::Continue, format!("Failed to play {url}: {e}"))
            }
        },
        Command::Stop => {
            let message = if controller.is_playing() {
                "Stopped"
            } else {
                "Nothing is playing"
            };
            controller.stop().await;
            (Flow::Continue, message.to_owned())
        }
        Command::Status => (Flow::Continue, status_line(controller)),
        Command::Help => (Flow::Continue, HELP.to_owned()),
        Command::Quit => (Flow::Exit, "Bye".to_owned()),
    }
}

pub fn status_line(controller: &StreamController) -> String {
    match (controller.is_playing(), controller.current_url()) {
        (true, Some(url)) => format!("Playing {url}"),
        _ => "Idle".to_owned(),
    }
}
