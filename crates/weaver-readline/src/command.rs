//! Parsing of REPL input lines.

use std::str::FromStr;

use weaver_core::dream::{Perspective, TagKind};

/// Slash commands accepted while the entry form is open.
pub const FORM_COMMANDS: &[&str] = &[
    "/tag",
    "/untag",
    "/kind",
    "/perspective",
    "/show",
    "/clear",
    "/submit",
    "/help",
    "/quit",
];

/// Slash commands accepted while a report is shown.
pub const REPORT_COMMANDS: &[&str] = &["/report", "/new", "/help", "/quit"];

const TAG_KINDS: &[&str] = &["emotion", "object", "person", "location"];
const PERSPECTIVES: &[&str] = &["psychological", "cultural", "creative"];

/// Keywords that may follow `command`, for completion.
pub fn argument_choices(command: &str) -> &'static [&'static str] {
    match command {
        "/kind" | "/tag" => TAG_KINDS,
        "/perspective" | "/p" => PERSPECTIVES,
        _ => &[],
    }
}

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Free text: narrative in the entry form, a chat message in the report view.
    Text(String),
    /// `/tag [kind] <label>`; without a kind the active kind is used.
    Tag { kind: Option<TagKind>, label: String },
    /// `/untag <n>`, 1-based position in the tag list.
    Untag(usize),
    Kind(TagKind),
    Perspective(Perspective),
    Show,
    Clear,
    Submit,
    Report,
    New,
    Help,
    Quit,
    /// A command that was recognized but used wrongly.
    Usage(&'static str),
    Unknown(String),
}

impl Command {
    /// Parses a line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        if !line.starts_with('/') {
            return Some(Command::Text(line.to_string()));
        }

        let (name, rest) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };

        let command = match name {
            "/tag" => parse_tag(rest),
            "/untag" => match rest.parse::<usize>() {
                Ok(n) if n > 0 => Command::Untag(n),
                _ => Command::Usage("/untag <number>"),
            },
            "/kind" => TagKind::from_str(rest)
                .map(Command::Kind)
                .unwrap_or(Command::Usage("/kind emotion|object|person|location")),
            "/perspective" | "/p" => Perspective::from_str(rest)
                .map(Command::Perspective)
                .unwrap_or(Command::Usage("/perspective psychological|cultural|creative")),
            "/show" => Command::Show,
            "/clear" => Command::Clear,
            "/submit" => Command::Submit,
            "/report" => Command::Report,
            "/new" => Command::New,
            "/help" => Command::Help,
            "/quit" | "/exit" => Command::Quit,
            other => Command::Unknown(other.to_string()),
        };
        Some(command)
    }
}

fn parse_tag(rest: &str) -> Command {
    if rest.is_empty() {
        return Command::Usage("/tag [emotion|object|person|location] <label>");
    }
    if let Some((first, label)) = rest.split_once(char::is_whitespace) {
        if let Ok(kind) = TagKind::from_str(first) {
            return Command::Tag {
                kind: Some(kind),
                label: label.trim().to_string(),
            };
        }
    }
    Command::Tag {
        kind: None,
        label: rest.to_string(),
    }
}
