//! Terminal rendering and interactive input

use colored::*;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, size},
};
use std::io::{self, IsTerminal, Write};

use nexus_core::{Language, Result, ServiceHealth};
use nexus_rag::{AskResponse, HealthReport, IndexedDocument};

use crate::governance::{GovernanceStats, LedgerDocument};

const PROMPT: &str = "nexus>";

/// Display the chat banner
pub fn display_banner() {
    let terminal_width = size().map(|(w, _)| w as usize).unwrap_or(80);
    let banner_width = std::cmp::min(60, terminal_width.saturating_sub(4)).max(40);
    let inner = banner_width - 2;

    println!();
    println!("{}", format!("┌{}┐", "─".repeat(inner)).blue());
    for line in [
        "Campus Nexus",
        "",
        "Ask questions about your uploaded campus documents.",
        "Type 'help' for commands, 'exit' to leave.",
    ] {
        let padding = inner.saturating_sub(line.chars().count() + 2);
        println!("{}", format!("│  {}{}│", line, " ".repeat(padding)).blue());
    }
    println!("{}", format!("└{}┘", "─".repeat(inner)).blue());
    println!();
}

/// Display chat help
pub fn print_help() {
    println!("{}", "Available commands:".bold());
    println!("  {} - Ask anything about the indexed documents", "<question>".green());
    println!("  {} - Switch the answer language", "lang <code>".green());
    println!("  {} - List supported languages", "languages".green());
    println!("  {} - Show this help message", "help".green());
    println!("  {} - Exit the chat", "exit/quit".green());
}

/// Read one line, with ↑/↓ history navigation on a terminal.
///
/// Returns `None` once piped input is exhausted or on Ctrl-C / Ctrl-D.
pub async fn handle_input_with_history(history: &mut Vec<String>) -> Result<Option<String>> {
    if !io::stdin().is_terminal() {
        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Ok(None);
        }
        let input = input.trim().to_string();
        if !input.is_empty() {
            history.push(input.clone());
        }
        return Ok(Some(input));
    }

    enable_raw_mode()?;
    let mut input = String::new();
    let mut history_index: Option<usize> = None;

    print!("{} ", PROMPT.green().bold());
    io::stdout().flush()?;

    loop {
        let Event::Key(key_event) = event::read()? else {
            continue;
        };
        if key_event.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key_event.code, KeyCode::Char('c') | KeyCode::Char('d'))
        {
            disable_raw_mode()?;
            println!();
            return Ok(None);
        }
        match key_event.code {
            KeyCode::Enter => {
                disable_raw_mode()?;
                println!();
                if !input.trim().is_empty() {
                    history.push(input.clone());
                }
                return Ok(Some(input.trim().to_string()));
            }
            KeyCode::Esc => {
                disable_raw_mode()?;
                println!();
                return Ok(Some(String::new()));
            }
            KeyCode::Char(c) => input.push(c),
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Up if !history.is_empty() => {
                let index = match history_index {
                    None => history.len() - 1,
                    Some(i) => i.saturating_sub(1),
                };
                history_index = Some(index);
                input = history[index].clone();
            }
            KeyCode::Down => match history_index {
                Some(i) if i + 1 < history.len() => {
                    history_index = Some(i + 1);
                    input = history[i + 1].clone();
                }
                Some(_) => {
                    history_index = None;
                    input.clear();
                }
                None => {}
            },
            _ => continue,
        }
        print!("\r\x1b[2K{} {}", PROMPT.green().bold(), input);
        io::stdout().flush()?;
    }
}

fn health_label(health: &ServiceHealth) -> ColoredString {
    match health {
        ServiceHealth::Ready => health.to_string().green(),
        ServiceHealth::Unavailable(_) => health.to_string().red(),
    }
}

pub fn format_health(report: &HealthReport) -> String {
    let status = if report.is_healthy() {
        report.status().green().bold()
    } else {
        report.status().yellow().bold()
    };

    let mut out = format!("{} {}\n", "System:".bold(), status);
    out.push_str(&format!("  {:<10} {}\n", "LLM", health_label(&report.llm)));
    out.push_str(&format!("  {:<10} {}\n", "Embedding", health_label(&report.embedding)));
    out.push_str(&format!("  {:<10} {}\n", "Index", health_label(&report.index)));
    out
}

pub fn format_answer(response: &AskResponse) -> String {
    let result = &response.result;
    let confidence = (result.confidence_score * 100.0).round() as u32;

    let mut out = format!("{}\n\n", result.answer);
    out.push_str(&format!(
        "{} {}%  ({:.2}s, {})\n",
        "Confidence:".bold(),
        confidence,
        response.processing_time_secs,
        result.language
    ));

    if !result.sources.is_empty() {
        out.push_str(&format!("{}\n", "Sources:".bold()));
        for (i, source) in result.sources.iter().enumerate() {
            let page = source.page.map(|p| format!(", page {}", p)).unwrap_or_default();
            out.push_str(&format!(
                "  {}. {}{} (relevance {:.2})\n",
                i + 1,
                source.filename.cyan(),
                page,
                source.relevance_score
            ));
            out.push_str(&format!("     {}\n", source.chunk_text.replace('\n', " ").dimmed()));
        }
    }
    out
}

pub fn format_documents(documents: &[IndexedDocument]) -> String {
    if documents.is_empty() {
        return "No documents indexed yet.\n".to_string();
    }

    let mut out = String::new();
    for doc in documents {
        let pages = doc
            .total_pages
            .map(|p| format!(", {} pages", p))
            .unwrap_or_default();
        out.push_str(&format!(
            "{}  {} ({}, {} chunks{})\n",
            doc.document_id.dimmed(),
            doc.filename.cyan(),
            doc.file_type,
            doc.chunks,
            pages
        ));
    }
    out
}

/// Render a flat JSON object as aligned `key: value` lines
pub fn format_stats(stats: &serde_json::Value) -> String {
    let Some(map) = stats.as_object() else {
        return format!("{}\n", stats);
    };
    map.iter()
        .map(|(key, value)| {
            let value = value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string());
            format!("{:<18} {}\n", format!("{}:", key), value)
        })
        .collect()
}

pub fn format_governance_stats(stats: &GovernanceStats) -> String {
    let rows = [
        ("Total documents", stats.total_documents.to_string()),
        ("Pending approval", stats.pending_approval.to_string()),
        ("Approved", stats.approved_documents.to_string()),
        ("Rejected", stats.rejected_documents.to_string()),
        ("Total queries", stats.total_queries.to_string()),
        ("Active users", stats.active_users.to_string()),
        ("Storage used", format!("{:.2} MB", stats.storage_used_mb)),
    ];
    rows.iter()
        .map(|(label, value)| format!("{:<18} {}\n", format!("{}:", label), value))
        .collect()
}

pub fn format_pending(documents: &[LedgerDocument]) -> String {
    if documents.is_empty() {
        return "No documents awaiting approval.\n".to_string();
    }

    documents
        .iter()
        .map(|doc| {
            format!(
                "{}  {} uploaded by {} on {}\n",
                doc.document_id.dimmed(),
                doc.record.filename.cyan(),
                doc.record.uploader,
                doc.record.upload_date.format("%Y-%m-%d %H:%M")
            )
        })
        .collect()
}

pub fn format_languages() -> String {
    Language::all()
        .iter()
        .map(|language| format!("{}  {}\n", language.code().green(), language.display_name()))
        .collect()
}
