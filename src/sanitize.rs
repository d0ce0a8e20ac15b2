//! Pure text transforms from raw shell transcripts to clean result strings.
//!
//! Nothing here does I/O. The functions take the captured transcript plus
//! the command that produced it and strip everything a human operator would
//! visually skip over: the echoed command line, shell prompts, pagination
//! banners and terminal control sequences.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config;

static CSI_SEQUENCE: Lazy<Regex> = Lazy::new(|| match Regex::new(r"\x1b\[[0-9;?]*[@-~]") {
    Ok(re) => re,
    Err(err) => panic!("invalid CSI_SEQUENCE regex: {err}"),
});

static ESC_SEQUENCE: Lazy<Regex> = Lazy::new(|| match Regex::new(r"\x1b.") {
    Ok(re) => re,
    Err(err) => panic!("invalid ESC_SEQUENCE regex: {err}"),
});

static CONTROL_CHARS: Lazy<Regex> =
    Lazy::new(|| match Regex::new(r"[\x00-\x08\x0b-\x1f\x7f]") {
        Ok(re) => re,
        Err(err) => panic!("invalid CONTROL_CHARS regex: {err}"),
    });

/// A line that is nothing but a shell prompt, in any mode.
static PROMPT_ONLY: Lazy<Regex> =
    Lazy::new(|| match Regex::new(r"^MA5683T(?:\([\w/-]+\))?[>#]\s*$") {
        Ok(re) => re,
        Err(err) => panic!("invalid PROMPT_ONLY regex: {err}"),
    });

/// A shell prompt glued to the front of a line, echo-style.
static PROMPT_PREFIX: Lazy<Regex> =
    Lazy::new(|| match Regex::new(r"^MA5683T(?:\([\w/-]+\))?[>#]\s*") {
        Ok(re) => re,
        Err(err) => panic!("invalid PROMPT_PREFIX regex: {err}"),
    });

/// One row of the board status report, keyed by its `n/n/n/n` slot address.
static BOARD_TABLE_ROW: Lazy<Regex> =
    Lazy::new(|| match Regex::new(r"^\s*(?:\d+/){3}\d+\s+") {
        Ok(re) => re,
        Err(err) => panic!("invalid BOARD_TABLE_ROW regex: {err}"),
    });

/// Sanitizes a raw command transcript into clean result text.
///
/// Applied transforms, in order: control and escape sequences are removed,
/// line endings are normalized, the first non-blank line is dropped when it
/// echoes `command`, pagination banner lines and prompt-only lines are
/// dropped, prompt prefixes are stripped, trailing whitespace is trimmed per
/// line, and blank edges are removed. Sanitizing already-sanitized text
/// returns it unchanged.
pub fn sanitize(raw: &str, command: &str) -> String {
    let text = CSI_SEQUENCE.replace_all(raw, "");
    let text = ESC_SEQUENCE.replace_all(&text, "");
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let text = CONTROL_CHARS.replace_all(&text, "");

    let mut lines: Vec<String> = Vec::new();
    let mut echo_pending = !command.is_empty();
    for line in text.lines() {
        if line.contains(config::MORE_BANNER) || line.contains(config::MORE_KEY_FRAGMENT) {
            continue;
        }
        if PROMPT_ONLY.is_match(line.trim()) {
            continue;
        }
        let line = PROMPT_PREFIX.replace(line, "");
        if echo_pending && !line.trim().is_empty() {
            // Only the first visible line can be the echo.
            echo_pending = false;
            if line.trim() == command {
                continue;
            }
        }
        lines.push(line.trim_end().to_string());
    }

    while lines.first().is_some_and(|line| line.is_empty()) {
        lines.remove(0);
    }
    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

/// Extracts the contiguous port table from a sanitized board status report.
///
/// Keeps the block of lines whose first token matches the `n/n/n/n` slot
/// address pattern and stops at the first blank line after the table began,
/// discarding header and footer chrome. Falls back to the input text when no
/// row matches, so callers always get something displayable. Other report
/// formats need their own extractor.
pub fn extract_board_table(text: &str) -> String {
    let mut rows: Vec<&str> = Vec::new();
    let mut in_table = false;
    for line in text.lines() {
        if BOARD_TABLE_ROW.is_match(line) {
            in_table = true;
            rows.push(line.trim());
        } else if in_table && line.trim().is_empty() {
            break;
        }
    }
    if rows.is_empty() {
        text.to_string()
    } else {
        rows.join("\n")
    }
}
