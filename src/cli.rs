// Command line flags. Actions are flags rather than subcommands; at most one
// of them runs per invocation, optionally preceded by `--login`.

use clap::{ArgGroup, Parser};

use crate::error::Error;

#[derive(Parser, Debug, Default)]
#[command(name = "gatrix", version, about = "A command line matrix client")]
#[command(group(ArgGroup::new("action").args(["list_rooms", "join", "leave", "send"])))]
pub struct Cli {
    /// Login to matrix server
    #[arg(short, long)]
    pub login: bool,

    /// List rooms
    #[arg(long)]
    pub list_rooms: bool,

    /// Join room (requires --room)
    #[arg(short, long)]
    pub join: bool,

    /// Leave room (requires --room)
    #[arg(long)]
    pub leave: bool,

    /// Send message (requires --room and --message or piped input)
    #[arg(short, long)]
    pub send: bool,

    /// Room id (i.e. !abc123:matrix.org)
    #[arg(short, long, value_name = "ID")]
    pub room: Option<String>,

    /// Message to send (requires --send)
    #[arg(short, long)]
    pub message: Option<String>,

    /// Render ANSI escape codes in the message as formatted text
    #[arg(long)]
    pub ansi: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,
}

/// The single room operation requested on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    ListRooms,
    Join { room_id: String },
    Leave { room_id: String },
    Send { room_id: String, message: Option<String> },
}

impl Cli {
    /// The requested action, if any. A room action without `--room` is a
    /// usage error, reported before anything touches the network.
    pub fn action(&self) -> Result<Option<Action>, Error> {
        let room_id = || {
            self.room
                .clone()
                .filter(|room| !room.is_empty())
                .ok_or_else(|| Error::Usage("room id is required (use --room)".into()))
        };
        let action = if self.list_rooms {
            Action::ListRooms
        } else if self.join {
            Action::Join { room_id: room_id()? }
        } else if self.leave {
            Action::Leave { room_id: room_id()? }
        } else if self.send {
            Action::Send {
                room_id: room_id()?,
                message: self.message.clone(),
            }
        } else {
            return Ok(None);
        };
        Ok(Some(action))
    }
}
