//! Text rendering for the two views.

use colored::Colorize;
use weaver_core::chat::{CHAT_EMPTY_STATE_PROMPT, ChatMessage};
use weaver_core::dream::{DreamDraft, Perspective};
use weaver_core::report::{AnalysisReport, BlockKind, REPORT_DISCLAIMER, ReportBlock};

pub const SPINNER_LABEL: &str = "Weaving your dream report…";
const SPINNER_FRAMES: [&str; 4] = ["◐", "◓", "◑", "◒"];

pub fn banner() -> String {
    format!(
        "{}\n{}",
        "=== Dreamweaver ===".bright_magenta().bold(),
        "Describe your dream line by line, then /submit. /help lists commands.".bright_black()
    )
}

pub fn help(in_form: bool) -> String {
    let lines: &[&str] = if in_form {
        &[
            "<text>                       append a line to your dream",
            "/tag [kind] <label>          add a key element (kinds: emotion, object, person, location)",
            "/kind <kind>                 set the default kind for /tag",
            "/untag <n>                   remove the n-th element",
            "/perspective <name>          toggle psychological, cultural or creative",
            "/show                        show the entry form",
            "/clear                       clear the narrative",
            "/submit                      weave the report",
            "/quit                        exit",
        ]
    } else {
        &[
            "<text>                       ask a follow-up question",
            "/report                      show the report again",
            "/new                         record a new dream",
            "/quit                        exit",
        ]
    };
    lines.join("\n").bright_black().to_string()
}

pub fn form(draft: &DreamDraft) -> String {
    let mut out = Vec::new();
    out.push("Dream".bright_white().bold().to_string());
    if draft.content().is_empty() {
        out.push("  (empty)".bright_black().to_string());
    } else {
        out.extend(draft.content().lines().map(|line| format!("  {line}")));
    }

    out.push(format!(
        "{} {}",
        "Key elements".bright_white().bold(),
        format!("(new tags: {})", draft.active_kind().label()).bright_black()
    ));
    if draft.tags().is_empty() {
        out.push("  (none)".bright_black().to_string());
    }
    for (idx, tag) in draft.tags().iter().enumerate() {
        out.push(format!("  {}. [{}] {}", idx + 1, tag.kind.label(), tag.label.cyan()));
    }

    out.push("Perspectives".bright_white().bold().to_string());
    for perspective in Perspective::all() {
        let selected = draft.perspectives().contains(perspective);
        let mark = if selected { "[x]".green() } else { "[ ]".normal() };
        out.push(format!(
            "  {mark} {}  {}",
            perspective.display_name(),
            perspective.description().bright_black()
        ));
    }
    out.join("\n")
}

fn block(block: &ReportBlock) -> String {
    let eyebrow = block.eyebrow.bright_black();
    let heading = match block.kind {
        BlockKind::Synthesis => block.heading.bright_magenta().bold(),
        BlockKind::Healing => block.heading.bright_yellow().bold(),
        _ => block.heading.bright_white().bold(),
    };
    format!("{eyebrow}\n{heading}\n{}", block.body)
}

pub fn message(message: &ChatMessage) -> String {
    if message.is_user() {
        format!("{} {}", "you ›".green(), message.text)
    } else {
        format!("{} {}", "weaver ›".bright_blue(), message.text.bright_blue())
    }
}

/// The report, the chat transcript, then the disclaimer.
pub fn report_view(report: &AnalysisReport, transcript: &[ChatMessage]) -> String {
    let mut parts: Vec<String> = report.blocks().iter().map(block).collect();
    if transcript.is_empty() {
        parts.push(CHAT_EMPTY_STATE_PROMPT.italic().to_string());
    } else {
        parts.push(transcript.iter().map(message).collect::<Vec<_>>().join("\n"));
    }
    parts.push(REPORT_DISCLAIMER.bright_black().to_string());
    parts.join("\n\n")
}

pub fn failure(message: &str) -> String {
    format!(
        "{}\n{}",
        message.red().bold(),
        "Type /new to return to the entry form.".bright_black()
    )
}

pub fn spinner(frame: usize) -> String {
    format!(
        "{} {}",
        SPINNER_FRAMES[frame % SPINNER_FRAMES.len()].bright_magenta(),
        SPINNER_LABEL
    )
}

pub fn typing() -> String {
    "weaver is typing…".bright_black().italic().to_string()
}

pub fn notice(text: &str) -> String {
    text.yellow().to_string()
}

pub fn error(text: &str) -> String {
    text.red().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use weaver_core::report::ReportSection;

    fn plain() {
        colored::control::set_override(false);
    }

    fn report(is_nightmare: bool) -> AnalysisReport {
        AnalysisReport {
            main_analysis: "core".into(),
            sections: vec![
                ReportSection {
                    title: "Shadow".into(),
                    content: "one".into(),
                },
                ReportSection {
                    title: "Myth".into(),
                    content: "two".into(),
                },
            ],
            life_work_advice: "advice".into(),
            adjustment_tips: "tips".into(),
            is_nightmare,
            healing_message: Some("light".into()),
        }
    }

    #[test]
    fn report_sections_follow_render_order() {
        plain();
        let text = report_view(&report(true), &[]);
        let order = [
            "Core Synthesis",
            "SECTION 01",
            "SECTION 02",
            "Life & Work Guidance",
            "A Prescription for the Heart",
            "Light in the Shadows",
            CHAT_EMPTY_STATE_PROMPT,
            REPORT_DISCLAIMER,
        ];
        let positions: Vec<usize> = order.iter().map(|s| text.find(s).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn healing_hidden_for_ordinary_dreams() {
        plain();
        let text = report_view(&report(false), &[]);
        assert!(!text.contains("Light in the Shadows"));
        assert!(!text.contains("light"));
    }

    #[test]
    fn transcript_replaces_empty_state_prompt() {
        plain();
        let transcript = [ChatMessage::user("why?"), ChatMessage::model("because")];
        let text = report_view(&report(false), &transcript);
        assert!(!text.contains(CHAT_EMPTY_STATE_PROMPT));
        assert!(text.contains("you › why?\nweaver › because"));
    }

    #[test]
    fn form_lists_tags_and_perspectives() {
        plain();
        let mut draft = DreamDraft::new();
        draft.push_line("a river");
        draft.add_tag("boat").unwrap();
        let text = form(&draft);
        assert!(text.contains("  a river"));
        assert!(text.contains("1. [Object] boat"));
        assert!(text.contains("[x] Psychological perspective"));
        assert!(text.contains("[ ] Creative-inspiration perspective"));
    }

    #[test]
    fn spinner_cycles_frames() {
        plain();
        assert!(spinner(0).ends_with(SPINNER_LABEL));
        assert_eq!(spinner(1), spinner(5));
    }
}
