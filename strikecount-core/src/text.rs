use regex::Regex;
use std::sync::OnceLock;

fn thinking_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)<thinking>.*?</thinking>|<think>.*?</think>|<reasoning>.*?</reasoning>")
            .expect("valid thinking regex")
    })
}

fn numbered_item_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*\d+\s*[.)]\s*(.+?)\s*$").expect("valid list regex"))
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t]{2,}").expect("valid whitespace regex"))
}

pub fn filter_coach_output(text: &str) -> String {
    // Strip <thinking>, <think>, <reasoning> blocks.
    let out = thinking_re().replace_all(text, "");
    let out = whitespace_re().replace_all(&out, " ");
    out.trim().to_string()
}

/// Extracts the items of a numbered list (`1. foo`, `2) bar`).
///
/// If the text has no numbered items, every non-empty line is an item.
pub fn parse_numbered_list(text: &str) -> Vec<String> {
    let numbered: Vec<String> = text
        .lines()
        .filter_map(|line| numbered_item_re().captures(line))
        .map(|c| clean_item(&c[1]))
        .filter(|s| !s.is_empty())
        .collect();

    if !numbered.is_empty() {
        return numbered;
    }

    text.lines()
        .map(|l| clean_item(l.trim_start_matches(['-', '*', ' '])))
        .filter(|s| !s.is_empty())
        .collect()
}

fn clean_item(s: &str) -> String {
    s.replace("**", "").trim().to_string()
}
