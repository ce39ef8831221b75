//! Interactive editing session

use std::path::PathBuf;

use imgedit_core::api::{ApiClient, ImageFile, describe_error};
use imgedit_core::chat::{ChatMessage, EditSession, MessageRole};
use imgedit_core::config::Config;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::warn;

const HELP: &str = "\
Commands:
  /attach <path>          Upload an image and edit it
  /image <path> <prompt>  Send an image together with a prompt
  /continuous on|off      Keep editing the latest result
  /download [name]        Save the current image
  /history                Show the conversation
  /export <file>          Write the conversation as JSON
  /reset                  Forget the conversation and the image
  /help                   Show this help
  /quit                   Leave
Anything else is sent as a prompt.";

/// One line of input
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Prompt(String),
    Attach(PathBuf),
    ImagePrompt(PathBuf, String),
    Continuous(Option<bool>),
    Download(Option<String>),
    History,
    Export(PathBuf),
    Reset,
    Help,
    Quit,
    Unknown(String),
}

impl Input {
    fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Some(Input::Prompt(line.to_string()));
        };

        let (name, rest) = match command.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (command, ""),
        };

        let input = match (name, rest) {
            ("attach", path) if !path.is_empty() => Input::Attach(PathBuf::from(path)),
            ("image", args) if !args.is_empty() => match args.split_once(char::is_whitespace) {
                Some((path, prompt)) => Input::ImagePrompt(PathBuf::from(path), prompt.trim().to_string()),
                None => Input::ImagePrompt(PathBuf::from(args), String::new()),
            },
            ("continuous", "") => Input::Continuous(None),
            ("continuous", "on") => Input::Continuous(Some(true)),
            ("continuous", "off") => Input::Continuous(Some(false)),
            ("download", "") => Input::Download(None),
            ("download", name) => Input::Download(Some(name.to_string())),
            ("history", _) => Input::History,
            ("export", path) if !path.is_empty() => Input::Export(PathBuf::from(path)),
            ("reset", _) => Input::Reset,
            ("help" | "?", _) => Input::Help,
            ("quit" | "exit" | "q", _) => Input::Quit,
            _ => Input::Unknown(line.to_string()),
        };
        Some(input)
    }
}

pub async fn run(
    client: ApiClient,
    config: &Config,
    image: Option<PathBuf>,
    continuous: bool,
) -> anyhow::Result<()> {
    let mut session = EditSession::from_config(client, config);
    session.set_continuous_edit(continuous);

    println!("imgedit chat ({})", session.client().base_url());
    println!("Type /help for commands.\n");

    if let Some(path) = image {
        attach(&mut session, path).await;
    }

    let mut editor = DefaultEditor::new()?;
    loop {
        let line = match editor.readline("imgedit> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let Some(input) = Input::parse(&line) else {
            continue;
        };
        if let Err(e) = editor.add_history_entry(line.as_str()) {
            warn!("Could not record history entry: {}", e);
        }

        match input {
            Input::Quit => break,
            Input::Help => println!("{}", HELP),
            Input::Unknown(line) => println!("Unknown command: {} (try /help)", line),
            Input::Prompt(text) => {
                // Failures land in the history as system messages
                let _ = session.send(&text).await;
                print_last(&session);
            }
            Input::Attach(path) => attach(&mut session, path).await,
            Input::ImagePrompt(path, text) => match ImageFile::from_path(&path).await {
                Ok(file) => {
                    let _ = session.send_with_image(file, &text).await;
                    print_last(&session);
                }
                Err(e) => println!("Could not read {}: {}", path.display(), e),
            },
            Input::Continuous(enabled) => {
                if let Some(enabled) = enabled {
                    session.set_continuous_edit(enabled);
                }
                let state = if session.continuous_edit() { "on" } else { "off" };
                println!("Continuous editing is {}", state);
            }
            Input::Download(name) => match session.current_image_url() {
                Some(url) => match session.client().try_download_image(url, name.as_deref()).await {
                    Ok(path) => println!("Saved {}", path.display()),
                    Err(e) => println!("Download failed: {}", describe_error(&e)),
                },
                None => println!("No image yet. Attach one or generate first."),
            },
            Input::History => {
                for message in session.history().messages() {
                    print_message(message);
                }
            }
            Input::Export(path) => {
                let json = session.history().to_json()?;
                match tokio::fs::write(&path, json).await {
                    Ok(()) => println!("Wrote {} messages to {}", session.history().len(), path.display()),
                    Err(e) => println!("Could not write {}: {}", path.display(), e),
                }
            }
            Input::Reset => {
                session.reset();
                println!("Conversation cleared.");
            }
        }
    }

    Ok(())
}

async fn attach(session: &mut EditSession, path: PathBuf) {
    let file = match ImageFile::from_path(&path).await {
        Ok(file) => file,
        Err(e) => {
            println!("Could not read {}: {}", path.display(), e);
            return;
        }
    };
    if session.attach_image(file).await.is_ok() {
        if let Some(url) = session.current_image_url() {
            println!("Attached {} ({})", path.display(), url);
        }
    } else {
        print_last(session);
    }
}

fn print_last(session: &EditSession) {
    if let Some(message) = session.history().last() {
        print_message(message);
    }
}

fn print_message(message: &ChatMessage) {
    let who = match message.role {
        MessageRole::User => "you",
        MessageRole::System => "imgedit",
    };
    println!("{:>8}: {}", who, message.content);
    if let Some(url) = &message.image_url {
        println!("{:>8}  {}", "", url);
    }
}
