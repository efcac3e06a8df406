//! The interactive shell: entry form and report+chat views over rustyline.

use std::borrow::Cow::{self, Borrowed, Owned};
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::Result;
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use tokio::sync::{mpsc, watch};
use weaver_application::{DreamFlow, IgnoreReason, ReportState, SendOutcome, View};

use crate::command::{Command, FORM_COMMANDS, REPORT_COMMANDS, argument_choices};
use crate::render;

/// Which view the prompt belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Form,
    Report,
}

impl Mode {
    fn prompt(self) -> &'static str {
        match self {
            Mode::Form => "dream › ",
            Mode::Report => "chat › ",
        }
    }

    fn commands(self) -> &'static [&'static str] {
        match self {
            Mode::Form => FORM_COMMANDS,
            Mode::Report => REPORT_COMMANDS,
        }
    }

    fn accepts(self, command: &str) -> bool {
        self.commands().contains(&command)
            || command == "/exit"
            || (self == Mode::Form && command == "/p")
    }
}

/// rustyline helper: completion, highlighting and hints for the commands of
/// the current view, plus tag kinds and perspectives in the entry form.
#[derive(Clone)]
struct CliHelper {
    mode: Arc<Mutex<Mode>>,
}

impl CliHelper {
    fn mode(&self) -> Mode {
        *self.mode.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start of the word being typed, the word, and the keywords that may complete it.
    fn choices<'l>(&self, line: &'l str) -> Option<(usize, &'l str, &'static [&'static str])> {
        if !line.starts_with('/') {
            return None;
        }
        let mode = self.mode();
        match line.split_once(' ') {
            None => Some((0, line, mode.commands())),
            Some((command, arg)) if mode == Mode::Form && !arg.contains(' ') => {
                Some((command.len() + 1, arg, argument_choices(command)))
            }
            Some(_) => None,
        }
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let Some((start, word, choices)) = self.choices(&line[..pos]) else {
            return Ok((0, vec![]));
        };
        let word = word.to_ascii_lowercase();
        let candidates = choices
            .iter()
            .filter(|choice| choice.starts_with(&word))
            .map(|choice| Pair {
                display: choice.to_string(),
                replacement: choice.to_string(),
            })
            .collect();
        Ok((start, candidates))
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if !line.starts_with('/') {
            return Borrowed(line);
        }
        let command = line.split_whitespace().next().unwrap_or(line);
        if self.mode().accepts(command) {
            Owned(line.bright_cyan().to_string())
        } else {
            Owned(line.yellow().to_string())
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        if pos < line.len() {
            return None;
        }
        let (_, word, choices) = self.choices(line)?;
        choices
            .iter()
            .find(|choice| choice.starts_with(word) && choice.len() > word.len())
            .map(|choice| choice[word.len()..].to_string())
    }
}

impl Validator for CliHelper {}

enum ReaderEvent {
    Line(String),
    Interrupted,
    Eof,
    Failed(String),
}

/// Reads lines on a dedicated thread so the async loop never blocks on stdin.
fn spawn_reader(mode: Arc<Mutex<Mode>>) -> mpsc::UnboundedReceiver<ReaderEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        let mut rl = match Editor::<CliHelper, DefaultHistory>::new() {
            Ok(rl) => rl,
            Err(err) => {
                let _ = tx.send(ReaderEvent::Failed(err.to_string()));
                return;
            }
        };
        let helper = CliHelper { mode };
        rl.set_helper(Some(helper.clone()));

        loop {
            let event = match rl.readline(helper.mode().prompt()) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        let _ = rl.add_history_entry(line.as_str());
                    }
                    ReaderEvent::Line(line)
                }
                Err(ReadlineError::Interrupted) => ReaderEvent::Interrupted,
                Err(ReadlineError::Eof) => ReaderEvent::Eof,
                Err(err) => ReaderEvent::Failed(err.to_string()),
            };
            let stop = matches!(event, ReaderEvent::Eof | ReaderEvent::Failed(_));
            if tx.send(event).is_err() || stop {
                break;
            }
        }
    });
    rx
}

/// Waits for the next report state, or forever when no report is pending.
async fn next_report_state(rx: &mut Option<watch::Receiver<ReportState>>) -> Option<ReportState> {
    match rx {
        Some(rx) => match rx.changed().await {
            Ok(()) => Some(rx.borrow_and_update().clone()),
            Err(_) => None,
        },
        None => std::future::pending().await,
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Step {
    Continue,
    Quit,
}

pub struct Shell {
    flow: DreamFlow,
    mode: Arc<Mutex<Mode>>,
    report_rx: Option<watch::Receiver<ReportState>>,
    /// Chat outcomes tagged with the id of the dream they belong to.
    chat_tx: mpsc::UnboundedSender<(String, SendOutcome)>,
    chat_rx: mpsc::UnboundedReceiver<(String, SendOutcome)>,
    spinner_frame: usize,
}

impl Shell {
    pub fn new(flow: DreamFlow) -> Self {
        let (chat_tx, chat_rx) = mpsc::unbounded_channel();
        Self {
            flow,
            mode: Arc::new(Mutex::new(Mode::Form)),
            report_rx: None,
            chat_tx,
            chat_rx,
            spinner_frame: 0,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        println!("{}", render::banner());
        println!();
        self.show_form();

        let mut input = spawn_reader(Arc::clone(&self.mode));
        let mut ticker = tokio::time::interval(Duration::from_millis(150));

        loop {
            tokio::select! {
                event = input.recv() => match event {
                    Some(ReaderEvent::Line(line)) => {
                        if self.handle_line(&line) == Step::Quit {
                            break;
                        }
                    }
                    Some(ReaderEvent::Interrupted) => {
                        println!("{}", render::notice("CTRL-C detected. Type /quit to exit."));
                    }
                    Some(ReaderEvent::Failed(err)) => {
                        eprintln!("{}", render::error(&format!("Input error: {err}")));
                        break;
                    }
                    Some(ReaderEvent::Eof) | None => break,
                },
                state = next_report_state(&mut self.report_rx) => match state {
                    Some(state) => self.on_report_state(state),
                    None => self.report_rx = None,
                },
                Some((dream_id, outcome)) = self.chat_rx.recv() => {
                    self.on_chat_outcome(&dream_id, outcome);
                }
                _ = ticker.tick(), if self.is_requesting() => {
                    print!("\r{}", render::spinner(self.spinner_frame));
                    let _ = std::io::stdout().flush();
                    self.spinner_frame += 1;
                }
            }
        }

        self.flow.reset();
        println!("{}", "Sweet dreams.".bright_green());
        Ok(())
    }

    fn set_mode(&self, mode: Mode) {
        *self.mode.lock().unwrap_or_else(PoisonError::into_inner) = mode;
    }

    fn is_requesting(&self) -> bool {
        self.flow
            .report_session()
            .is_some_and(|session| session.state() == ReportState::Requesting)
    }

    fn show_form(&self) {
        if let View::EntryForm(draft) = self.flow.view() {
            println!("{}", render::form(draft));
        }
    }

    fn show_report(&self) {
        let Some(session) = self.flow.report_session() else {
            return;
        };
        match session.state() {
            ReportState::Ready(report) => {
                let transcript = match session.chat() {
                    Some(chat) => chat.messages(),
                    None => Vec::new(),
                };
                println!("{}", render::report_view(&report, &transcript));
            }
            ReportState::Failed(message) => println!("{}", render::failure(&message)),
            ReportState::Idle | ReportState::Requesting => {
                println!("{}", render::notice("The report is still being woven."));
            }
        }
    }

    fn on_report_state(&mut self, state: ReportState) {
        if !state.is_terminal() {
            return;
        }
        // clear the spinner line
        print!("\r\x1b[2K");
        self.show_report();
        self.report_rx = None;
    }

    fn on_chat_outcome(&self, dream_id: &str, outcome: SendOutcome) {
        let current = self.flow.report_session();
        if current.is_none_or(|session| session.record().id != dream_id) {
            tracing::debug!(dream_id, "dropping chat outcome from a previous dream");
            return;
        }
        match outcome {
            SendOutcome::Replied(message) | SendOutcome::Apologized(message) => {
                println!("{}", render::message(&message));
            }
            SendOutcome::Ignored(IgnoreReason::Busy) => {
                println!(
                    "{}",
                    render::notice("Still answering your last message; that one was not sent.")
                );
            }
            SendOutcome::Ignored(IgnoreReason::Empty | IgnoreReason::Closed)
            | SendOutcome::Discarded => {}
        }
    }

    fn handle_line(&mut self, line: &str) -> Step {
        let Some(command) = Command::parse(line) else {
            return Step::Continue;
        };
        match command {
            Command::Quit => return Step::Quit,
            Command::Help => {
                let in_form = matches!(self.flow.view(), View::EntryForm(_));
                println!("{}", render::help(in_form));
            }
            Command::Usage(usage) => println!("{}", render::notice(&format!("Usage: {usage}"))),
            Command::Unknown(name) => {
                println!("{}", render::notice(&format!("Unknown command {name}. Try /help.")));
            }
            other => match self.flow.view() {
                View::EntryForm(_) => self.handle_form_command(other),
                View::Report(_) => self.handle_report_command(other),
            },
        }
        Step::Continue
    }

    fn handle_form_command(&mut self, command: Command) {
        if let Command::Submit = command {
            self.submit();
            return;
        }
        let Some(draft) = self.flow.draft_mut() else {
            return;
        };
        let result = match command {
            Command::Text(text) => {
                draft.push_line(&text);
                Ok(())
            }
            Command::Tag { kind, label } => {
                let kind = kind.unwrap_or(draft.active_kind());
                draft.add_tag_of_kind(kind, &label).map(|tag| {
                    println!("{}", format!("+ [{}] {}", tag.kind.label(), tag.label).cyan());
                })
            }
            Command::Untag(n) => {
                match draft.tags().get(n - 1).map(|tag| tag.id.clone()) {
                    Some(id) => {
                        draft.remove_tag(&id);
                    }
                    None => println!("{}", render::notice(&format!("There is no element {n}."))),
                }
                Ok(())
            }
            Command::Kind(kind) => {
                draft.set_active_kind(kind);
                Ok(())
            }
            Command::Perspective(perspective) => draft.toggle_perspective(perspective),
            Command::Clear => {
                draft.set_content("");
                Ok(())
            }
            Command::Show => {
                println!("{}", render::form(draft));
                Ok(())
            }
            Command::Report | Command::New => {
                println!("{}", render::notice("There is no report yet. /submit your dream first."));
                Ok(())
            }
            _ => Ok(()),
        };
        if let Err(err) = result {
            println!("{}", render::notice(&err.user_message()));
        }
    }

    fn submit(&mut self) {
        match self.flow.submit() {
            Ok(session) => {
                let mut rx = session.subscribe();
                // the report may already have settled
                rx.mark_changed();
                self.report_rx = Some(rx);
                self.spinner_frame = 0;
                self.set_mode(Mode::Report);
                println!("{}", render::spinner(0));
            }
            Err(err) => println!("{}", render::notice(&err.user_message())),
        }
    }

    fn handle_report_command(&mut self, command: Command) {
        let Some(session) = self.flow.report_session() else {
            return;
        };
        match command {
            Command::Text(text) => {
                let Some(chat) = session.chat() else {
                    let hint = match session.state() {
                        ReportState::Failed(_) => "This report failed. Type /new to start over.",
                        _ => "The report is still being woven.",
                    };
                    println!("{}", render::notice(hint));
                    return;
                };
                if !chat.is_typing() {
                    println!("{}", render::typing());
                }
                let tx = self.chat_tx.clone();
                let dream_id = session.record().id.clone();
                tokio::spawn(async move {
                    let outcome = chat.send_user_message(&text).await;
                    let _ = tx.send((dream_id, outcome));
                });
            }
            Command::Report => self.show_report(),
            Command::New => {
                self.flow.reset();
                self.report_rx = None;
                self.set_mode(Mode::Form);
                println!();
                self.show_form();
            }
            _ => println!(
                "{}",
                render::notice("The entry form is closed. Type /new to record another dream.")
            ),
        }
    }
}
