// UI layer: interactive login prompts using `dialoguer`, dispatch of the
// room action picked on the command line, and the printed output.

use std::io::{self, IsTerminal, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use dialoguer::{Input, Password};
use indicatif::{ProgressBar, ProgressStyle};

use crate::api::ApiClient;
use crate::cli::{Action, Cli};
use crate::credentials::normalize_server_address;
use crate::error::Error;
use crate::message::{read_piped, OutgoingMessage};
use crate::session::{authenticate, probe_server, Config};
use crate::sync::{RoomList, RoomSummary};

/// Run what the command line asks for: login first when requested, then the
/// room action, if any.
pub fn run(cli: &Cli, config: &Config) -> Result<()> {
    let action = cli.action()?;
    if cli.login {
        handle_login(config)?;
    }
    let Some(action) = action else {
        return Ok(());
    };

    match action {
        Action::ListRooms => handle_list_rooms(&config.connect()?),
        Action::Join { room_id } => config.connect()?.join_room(&room_id),
        Action::Leave { room_id } => config.connect()?.leave_room(&room_id),
        Action::Send { room_id, message } => {
            // The message is resolved before credentials or the network.
            let message = message_text(message.as_deref(), cli.ansi)?;
            handle_send(&config.connect()?, &room_id, &message)
        }
    }
}

/// Prompt for the server, check it, then prompt for username and password.
/// The password is read without echo.
fn handle_login(config: &Config) -> Result<()> {
    let address: String = Input::new().with_prompt("Server address").interact_text()?;
    let server_url = normalize_server_address(&address);
    let api = probe_server(&server_url)?;

    let username: String = Input::new().with_prompt("Username").interact_text()?;
    let password: String = Password::new().with_prompt("Password").interact()?;

    let credentials = authenticate(config, &api, &username, &password)?;
    println!("Logged in as {}", credentials.user_id);
    Ok(())
}

fn handle_list_rooms(api: &ApiClient) -> Result<()> {
    let spinner = spinner("Getting room data...");
    let rooms = api.list_rooms();
    spinner.finish_and_clear();
    print_rooms(&mut io::stdout().lock(), &rooms?)?;
    Ok(())
}

fn handle_send(api: &ApiClient, room_id: &str, message: &OutgoingMessage) -> Result<()> {
    let spinner = spinner("Sending message...");
    let sent = api.send_message(room_id, message);
    spinner.finish_and_clear();
    sent?;
    Ok(())
}

/// The message from `--message`, or everything piped into stdin.
fn message_text(flag: Option<&str>, ansi: bool) -> Result<OutgoingMessage> {
    let text = match flag.filter(|m| !m.is_empty()) {
        Some(text) => text.to_string(),
        None => {
            let stdin = io::stdin();
            if stdin.is_terminal() {
                return Err(Error::Usage("message is required (use --message or pipe input)".into()).into());
            }
            read_piped(stdin.lock()).context("Failed to read message from stdin")?
        }
    };
    Ok(OutgoingMessage::from_input(&text, ansi))
}

/// `room_id: name` per room, joined rooms first, in room-id order.
pub fn print_rooms(out: &mut impl Write, rooms: &RoomList) -> io::Result<()> {
    print_section(out, "joined", rooms.joined.as_deref())?;
    writeln!(out)?;
    print_section(out, "invited", rooms.invited.as_deref())
}

fn print_section(out: &mut impl Write, kind: &str, rooms: Option<&[RoomSummary]>) -> io::Result<()> {
    match rooms {
        Some(rooms) => {
            writeln!(out, "{kind} rooms:")?;
            for room in rooms {
                writeln!(out, "{}: {}", room.room_id, room.display_name)?;
            }
            Ok(())
        }
        None => writeln!(out, "no {kind} rooms"),
    }
}

/// Spinner on stderr; hidden when stderr is not a terminal.
fn spinner(msg: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(msg);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn room(id: &str, name: &str) -> RoomSummary {
        RoomSummary {
            room_id: id.into(),
            display_name: name.into(),
        }
    }

    #[test]
    fn prints_both_sections() {
        let rooms = RoomList {
            joined: Some(vec![room("!a:h", "Alpha"), room("!b:h", "<Unnamed room>")]),
            invited: Some(vec![room("!c:h", "Party")]),
        };
        let mut out = Vec::new();
        print_rooms(&mut out, &rooms).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "joined rooms:\n!a:h: Alpha\n!b:h: <Unnamed room>\n\ninvited rooms:\n!c:h: Party\n"
        );
    }

    #[test]
    fn empty_section_keeps_header_missing_section_says_none() {
        let rooms = RoomList {
            joined: Some(Vec::new()),
            invited: None,
        };
        let mut out = Vec::new();
        print_rooms(&mut out, &rooms).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "joined rooms:\n\nno invited rooms\n");
    }

    #[test]
    fn flag_message_is_unescaped() {
        let msg = message_text(Some(r"line one\nline two"), false).unwrap();
        assert_eq!(msg.body, "line one\nline two");
        assert_eq!(msg.formatted_body, None);
    }
}
