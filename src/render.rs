//! Console output: status lines, boxed panels and the proposed-edits table.

use std::io::{self, Write};

use crossterm::style::Stylize;
use unicode_width::UnicodeWidthChar;
use unicode_width::UnicodeWidthStr;

use crate::reply::FileEditRequest;

const MAX_CELL_WIDTH: usize = 48;

pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn warning(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

pub fn failure(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

pub fn assistant_prefix() {
    print!("\n{}", "Assistant> ".blue().bold());
    let _ = io::stdout().flush();
}

pub fn fragment(text: &str) {
    print!("{text}");
    let _ = io::stdout().flush();
}

pub fn banner() {
    let title = panel("", "Welcome to seaforge with Structured Output (and streaming)");
    println!("{}", title.blue().bold());
    println!(
        "To include a file in the conversation, use '{}'.\nType '{}' or '{}' to end.\n",
        "/add path/to/file".magenta(),
        "exit".red(),
        "quit".red()
    );
}

pub fn help() {
    println!("Local commands:");
    println!("  /add <path>   load a file into the conversation");
    println!("  /files        list files already in the conversation");
    println!("  /help         show this help");
    println!("  exit | quit   end the session");
}

/// Shown when an edit's original snippet could not be located.
pub fn snippet_mismatch(expected: &str, actual: &str) {
    println!("\nExpected snippet:");
    println!("{}", panel("Expected", expected).yellow());
    println!("\nActual file content:");
    println!("{}", panel("Actual", actual).yellow());
}

pub fn proposed_edits(edits: &[FileEditRequest]) {
    if edits.is_empty() {
        return;
    }
    println!("{}", panel("Proposed Edits", &edits_table(edits)).magenta());
}

pub fn panel(title: &str, body: &str) -> String {
    let body = body.replace('\t', "    ");
    let content_width = body
        .lines()
        .map(UnicodeWidthStr::width)
        .max()
        .unwrap_or(0)
        .max(title.width() + 2);
    let inner = content_width + 2;

    let mut out = String::new();
    if title.is_empty() {
        out.push_str(&format!("╭{}╮\n", "─".repeat(inner)));
    } else {
        let label = format!(" {title} ");
        let left = (inner - label.width()) / 2;
        let right = inner - label.width() - left;
        out.push_str(&format!("╭{}{}{}╮\n", "─".repeat(left), label, "─".repeat(right)));
    }
    let lines: Vec<&str> = if body.is_empty() { vec![""] } else { body.lines().collect() };
    for line in lines {
        let pad = content_width - line.width();
        out.push_str(&format!("│ {}{} │\n", line, " ".repeat(pad)));
    }
    out.push_str(&format!("╰{}╯", "─".repeat(inner)));
    out
}

/// Three-column grid of path / original / new; long lines are wrapped.
pub fn edits_table(edits: &[FileEditRequest]) -> String {
    let mut rows: Vec<[Vec<String>; 3]> = vec![[
        vec!["File Path".to_string()],
        vec!["Original".to_string()],
        vec!["New".to_string()],
    ]];
    for edit in edits {
        rows.push([
            wrap(&edit.path, MAX_CELL_WIDTH),
            wrap(&edit.original_snippet, MAX_CELL_WIDTH),
            wrap(&edit.new_snippet, MAX_CELL_WIDTH),
        ]);
    }

    let mut widths = [0usize; 3];
    for row in &rows {
        for (col, cell) in row.iter().enumerate() {
            let w = cell.iter().map(|l| l.width()).max().unwrap_or(0);
            widths[col] = widths[col].max(w);
        }
    }

    let rule = |l: &str, m: &str, r: &str| {
        let parts: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
        format!("{l}{}{r}", parts.join(m))
    };

    let mut out = vec![rule("┌", "┬", "┐")];
    for (idx, row) in rows.iter().enumerate() {
        if idx > 0 {
            out.push(rule("├", "┼", "┤"));
        }
        let height = row.iter().map(Vec::len).max().unwrap_or(1);
        for line_no in 0..height {
            let mut line = String::from("│");
            for (col, cell) in row.iter().enumerate() {
                let text = cell.get(line_no).map(String::as_str).unwrap_or("");
                line.push_str(&format!(" {}{} │", text, " ".repeat(widths[col] - text.width())));
            }
            out.push(line);
        }
    }
    out.push(rule("└", "┴", "┘"));
    out.join("\n")
}

fn wrap(text: &str, max_width: usize) -> Vec<String> {
    let mut out = Vec::new();
    for line in text.lines() {
        let mut current = String::new();
        let mut width = 0usize;
        for ch in line.chars() {
            let ch = if ch == '\t' { ' ' } else { ch };
            let w = ch.width().unwrap_or(0);
            if width + w > max_width {
                out.push(std::mem::take(&mut current));
                width = 0;
            }
            current.push(ch);
            width += w;
        }
        out.push(current);
    }
    if out.is_empty() {
        out.push(String::new());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panel_lines_share_one_width() {
        let out = panel("Actual", "fn main() {}\n    println!(\"é\");\n");
        let widths: Vec<usize> = out.lines().map(UnicodeWidthStr::width).collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]), "{out}");
        assert!(out.starts_with("╭") && out.contains(" Actual "));
    }

    #[test]
    fn table_has_header_and_one_block_per_edit() {
        let edits = vec![
            FileEditRequest {
                path: "/a.py".into(),
                original_snippet: "x = 1\ny = 2".into(),
                new_snippet: "x = 3".into(),
            },
            FileEditRequest {
                path: "/b.py".into(),
                original_snippet: "z".into(),
                new_snippet: "".into(),
            },
        ];
        let table = edits_table(&edits);
        let lines: Vec<&str> = table.lines().collect();
        // top, header, rule, 2 lines, rule, 1 line, bottom
        assert_eq!(lines.len(), 8);
        assert!(lines[1].contains("File Path") && lines[1].contains("Original"));
        assert!(lines[3].contains("/a.py") && lines[4].contains("y = 2"));
        let widths: Vec<usize> = lines.iter().map(|l| l.width()).collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn long_lines_wrap_at_cell_width() {
        let wrapped = wrap(&"a".repeat(100), 48);
        assert_eq!(wrapped.len(), 3);
        assert_eq!(wrapped[0].len(), 48);
        assert_eq!(wrap("", 10), vec![String::new()]);
    }
}
