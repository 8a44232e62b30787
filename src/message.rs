// Outgoing `m.room.message` bodies and the text preparation applied before
// sending.

use std::io::Read;

use serde::Serialize;

use crate::ansi;

/// Message format Matrix uses for HTML bodies.
pub const HTML_FORMAT: &str = "org.matrix.custom.html";

/// Content of an `m.text` message, with an optional HTML rendition.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub msgtype: &'static str,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted_body: Option<String>,
}

impl OutgoingMessage {
    pub fn text(body: impl Into<String>) -> Self {
        OutgoingMessage {
            msgtype: "m.text",
            body: body.into(),
            format: None,
            formatted_body: None,
        }
    }

    /// Build the message for `text`. With `ansi` set, escape codes are
    /// rendered into a preformatted HTML body and stripped from the plain one.
    pub fn from_input(text: &str, ansi: bool) -> Self {
        let text = unescape(text);
        if !ansi {
            return OutgoingMessage::text(text);
        }
        OutgoingMessage {
            format: Some(HTML_FORMAT),
            formatted_body: Some(format!("<pre>{}</pre>", ansi::to_html(&text))),
            ..OutgoingMessage::text(ansi::strip(&text))
        }
    }
}

/// Turn the literal two-character sequences `\n` and `\t` into a newline and
/// a tab.
pub fn unescape(text: &str) -> String {
    text.replace("\\n", "\n").replace("\\t", "\t")
}

/// Read `reader` to the end and drop one trailing newline.
pub fn read_piped(mut reader: impl Read) -> std::io::Result<String> {
    let mut buffer = String::new();
    reader.read_to_string(&mut buffer)?;
    if buffer.ends_with('\n') {
        buffer.pop();
    }
    Ok(buffer)
}
