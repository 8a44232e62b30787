// Conversion of ANSI terminal escape sequences into the HTML subset Matrix
// clients render in `formatted_body`.
//
// Only SGR sequences (`ESC [ ... m`) carry styling. Every other escape
// sequence is dropped from the output.

use std::fmt::Write as _;

const ESC: char = '\u{1b}';

/// xterm's values for the 16 basic and bright colours.
const PALETTE: [(u8, u8, u8); 16] = [
    (0x00, 0x00, 0x00),
    (0xcd, 0x00, 0x00),
    (0x00, 0xcd, 0x00),
    (0xcd, 0xcd, 0x00),
    (0x00, 0x00, 0xee),
    (0xcd, 0x00, 0xcd),
    (0x00, 0xcd, 0xcd),
    (0xe5, 0xe5, 0xe5),
    (0x7f, 0x7f, 0x7f),
    (0xff, 0x00, 0x00),
    (0x00, 0xff, 0x00),
    (0xff, 0xff, 0x00),
    (0x5c, 0x5c, 0xff),
    (0xff, 0x00, 0xff),
    (0x00, 0xff, 0xff),
    (0xff, 0xff, 0xff),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Rgb(u8, u8, u8);

impl Rgb {
    fn indexed(index: u8) -> Rgb {
        match index {
            0..=15 => {
                let (r, g, b) = PALETTE[index as usize];
                Rgb(r, g, b)
            }
            16..=231 => {
                let level = |v: u8| if v == 0 { 0 } else { 55 + v * 40 };
                let i = index - 16;
                Rgb(level(i / 36), level((i / 6) % 6), level(i % 6))
            }
            _ => {
                let gray = 8 + (index - 232) * 10;
                Rgb(gray, gray, gray)
            }
        }
    }

    fn hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Style {
    bold: bool,
    italic: bool,
    underline: bool,
    fg: Option<Rgb>,
    bg: Option<Rgb>,
}

impl Style {
    /// Apply the parameters of one SGR sequence. An empty list is a reset.
    fn apply(&mut self, params: &[u16]) {
        if params.is_empty() {
            *self = Style::default();
            return;
        }
        let mut params = params.iter().copied();
        while let Some(code) = params.next() {
            match code {
                0 => *self = Style::default(),
                1 => self.bold = true,
                3 => self.italic = true,
                4 => self.underline = true,
                22 => self.bold = false,
                23 => self.italic = false,
                24 => self.underline = false,
                30..=37 => self.fg = Some(Rgb::indexed((code - 30) as u8)),
                39 => self.fg = None,
                40..=47 => self.bg = Some(Rgb::indexed((code - 40) as u8)),
                49 => self.bg = None,
                90..=97 => self.fg = Some(Rgb::indexed((code - 90 + 8) as u8)),
                100..=107 => self.bg = Some(Rgb::indexed((code - 100 + 8) as u8)),
                // An incomplete extended colour leaves the current one alone.
                38 => self.fg = extended_color(&mut params).or(self.fg),
                48 => self.bg = extended_color(&mut params).or(self.bg),
                _ => {}
            }
        }
    }

    fn open(&self, out: &mut String) {
        if self.fg.is_some() || self.bg.is_some() {
            out.push_str("<span");
            if let Some(fg) = self.fg {
                let _ = write!(out, " data-mx-color=\"{}\"", fg.hex());
            }
            if let Some(bg) = self.bg {
                let _ = write!(out, " data-mx-bg-color=\"{}\"", bg.hex());
            }
            out.push('>');
        }
        if self.bold {
            out.push_str("<b>");
        }
        if self.italic {
            out.push_str("<i>");
        }
        if self.underline {
            out.push_str("<u>");
        }
    }

    fn close(&self, out: &mut String) {
        if self.underline {
            out.push_str("</u>");
        }
        if self.italic {
            out.push_str("</i>");
        }
        if self.bold {
            out.push_str("</b>");
        }
        if self.fg.is_some() || self.bg.is_some() {
            out.push_str("</span>");
        }
    }
}

/// `5;n` (256 colours) or `2;r;g;b` (truecolour) following a 38 or 48.
fn extended_color(params: &mut impl Iterator<Item = u16>) -> Option<Rgb> {
    match params.next()? {
        5 => params.next().map(|n| Rgb::indexed(n.min(255) as u8)),
        2 => {
            let mut channel = || params.next().map(|v| v.min(255) as u8);
            Some(Rgb(channel()?, channel()?, channel()?))
        }
        _ => None,
    }
}

enum Token<'a> {
    Text(&'a str),
    Sgr(Vec<u16>),
    Other,
}

/// Split `input` into text runs and escape sequences.
fn tokenize(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut rest = input;
    while !rest.is_empty() {
        let Some(start) = rest.find(ESC) else {
            tokens.push(Token::Text(rest));
            break;
        };
        if start > 0 {
            tokens.push(Token::Text(&rest[..start]));
        }
        let seq = &rest[start + ESC.len_utf8()..];
        if let Some(csi) = seq.strip_prefix('[') {
            // CSI: parameter and intermediate bytes, then one final byte.
            match csi.find(|c: char| ('\u{40}'..='\u{7e}').contains(&c)) {
                Some(end) => {
                    let final_byte = csi[end..].chars().next().unwrap_or('m');
                    if final_byte == 'm' {
                        tokens.push(Token::Sgr(parse_params(&csi[..end])));
                    } else {
                        tokens.push(Token::Other);
                    }
                    rest = &csi[end + final_byte.len_utf8()..];
                }
                None => {
                    tokens.push(Token::Other);
                    rest = "";
                }
            }
        } else {
            // nF/Fe escape: optional intermediate bytes, then one final byte.
            tokens.push(Token::Other);
            let seq = seq.trim_start_matches(|c: char| ('\u{20}'..='\u{2f}').contains(&c));
            let mut chars = seq.chars();
            chars.next();
            rest = chars.as_str();
        }
    }
    tokens
}

fn parse_params(params: &str) -> Vec<u16> {
    if params.is_empty() {
        return Vec::new();
    }
    params
        .split([';', ':'])
        // Empty means the default (0); anything unparsable is an unknown code.
        .map(|p| if p.is_empty() { 0 } else { p.parse().unwrap_or(u16::MAX) })
        .collect()
}

fn escape_html(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}

/// Convert ANSI-styled text into an HTML fragment. Styles are rendered as
/// `span` colour attributes plus `b`/`i`/`u`, closed before every change.
pub fn to_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut style = Style::default();
    let mut open = false;
    for token in tokenize(input) {
        match token {
            Token::Text(text) => {
                if !open && style != Style::default() {
                    style.open(&mut out);
                    open = true;
                }
                escape_html(text, &mut out);
            }
            Token::Sgr(params) => {
                let mut next = style;
                next.apply(&params);
                if next != style && open {
                    style.close(&mut out);
                    open = false;
                }
                style = next;
            }
            Token::Other => {}
        }
    }
    if open {
        style.close(&mut out);
    }
    out
}

/// The text with every escape sequence removed.
pub fn strip(input: &str) -> String {
    tokenize(input)
        .into_iter()
        .filter_map(|token| match token {
            Token::Text(text) => Some(text),
            _ => None,
        })
        .collect()
}
