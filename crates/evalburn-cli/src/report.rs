use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use evalburn_core::{SessionLogEntry, SessionSummary};

const NOT_AVAILABLE: &str = "N/A";

const CSV_HEADER: [&str; 11] = [
    "problem",
    "model",
    "style",
    "test_result",
    "passed_count",
    "total_tests",
    "exec_time_ms",
    "code_lines",
    "gen_time_s",
    "prompt_tokens",
    "completion_tokens",
];

/// Output paths for one interactive or batch session.
#[derive(Debug, Clone)]
pub struct SessionFiles {
    pub timestamp: String,
    pub log_path: PathBuf,
    pub csv_path: PathBuf,
}

impl SessionFiles {
    pub fn new(log_dir: &Path, timestamp: &str) -> Self {
        Self {
            timestamp: timestamp.to_string(),
            log_path: log_dir.join(format!("session_log_{}.txt", timestamp)),
            csv_path: log_dir.join(format!("session_report_{}.csv", timestamp)),
        }
    }

    pub fn now(log_dir: &Path) -> Self {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        Self::new(log_dir, &timestamp)
    }
}

fn exec_time(entry: &SessionLogEntry) -> String {
    entry
        .exec_time_ms
        .map(|ms| format!("{:.4}", ms))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn code_lines(entry: &SessionLogEntry) -> String {
    entry
        .code_lines
        .map(|n| n.to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn gen_time(entry: &SessionLogEntry) -> String {
    entry
        .generation
        .as_ref()
        .map(|g| format!("{:.2}", g.elapsed_seconds))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn prompt_tokens(entry: &SessionLogEntry) -> String {
    entry
        .generation
        .as_ref()
        .map(|g| g.prompt_tokens.to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn completion_tokens(entry: &SessionLogEntry) -> String {
    entry
        .generation
        .as_ref()
        .map(|g| g.completion_tokens.to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// One-line progress summary printed after each problem.
pub fn render_entry(entry: &SessionLogEntry) -> String {
    let mut out = String::new();
    match &entry.generation {
        Some(g) => {
            let _ = writeln!(
                out,
                "  Generation: {:.2}s, Tokens (P/C): {}/{}",
                g.elapsed_seconds, g.prompt_tokens, g.completion_tokens
            );
        }
        None => {
            let _ = writeln!(out, "  Generation: {}", NOT_AVAILABLE);
        }
    }
    let _ = writeln!(out, "  Validation: {}", entry.test_result);
    if let Some(ms) = entry.exec_time_ms {
        let _ = writeln!(
            out,
            "  Performance: {:.4} ms, Code Length: {} LoC",
            ms,
            code_lines(entry)
        );
    }
    out
}

pub fn render_table(entries: &[SessionLogEntry]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Session Summary Report:");
    let _ = writeln!(out, "{:-<118}", "");
    let _ = writeln!(
        out,
        "  {:<28} {:<22} {:<34} {:>10} {:>5} {:>8} {:>6}",
        "Problem", "Model", "Result", "Exec (ms)", "LoC", "Gen (s)", "Tok C"
    );
    let _ = writeln!(out, "{:-<118}", "");
    for entry in entries {
        let _ = writeln!(
            out,
            "  {:<28} {:<22} {:<34} {:>10} {:>5} {:>8} {:>6}",
            entry.problem,
            entry.model,
            entry.test_result,
            exec_time(entry),
            code_lines(entry),
            gen_time(entry),
            completion_tokens(entry)
        );
    }
    out
}

pub fn render_summary(summary: &SessionSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Totals:");
    let _ = writeln!(out, "{:-<40}", "");
    let _ = writeln!(out, "  Runs:          {}", summary.runs);
    let _ = writeln!(out, "  Fully passed:  {}", summary.fully_passed);
    let _ = writeln!(out, "  Errored:       {}", summary.errored);
    let _ = writeln!(
        out,
        "  Tests passed:  {}/{}",
        summary.tests_passed, summary.tests_total
    );
    let _ = writeln!(out, "  Pass rate:     {:.1}%", summary.pass_rate * 100.0);
    if let Some(ms) = summary.avg_exec_time_ms {
        let _ = writeln!(out, "  Avg exec:      {:.4} ms", ms);
    }
    out
}

/// Quote a CSV field when it holds a separator, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_row(fields: &[String]) -> String {
    let cells: Vec<String> = fields.iter().map(|f| csv_field(f)).collect();
    format!("{}\r\n", cells.join(","))
}

pub fn render_csv(entries: &[SessionLogEntry]) -> String {
    let header: Vec<String> = CSV_HEADER.iter().map(|h| h.to_string()).collect();
    let mut out = csv_row(&header);
    for entry in entries {
        out.push_str(&csv_row(&[
            entry.problem.clone(),
            entry.model.clone(),
            entry.style.clone(),
            entry.test_result.clone(),
            entry.passed_count.to_string(),
            entry.total_tests.to_string(),
            exec_time(entry),
            code_lines(entry),
            gen_time(entry),
            prompt_tokens(entry),
            completion_tokens(entry),
        ]));
    }
    out
}

pub fn render_session_log(timestamp: &str, entries: &[SessionLogEntry]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "evalburn Session Log - {}", timestamp);
    let _ = writeln!(out);
    for (idx, entry) in entries.iter().enumerate() {
        let _ = writeln!(out, "{:=<70}", "");
        let _ = writeln!(out, "Run {}: {}", idx + 1, entry.problem);
        let _ = writeln!(out, "Model: {}", entry.model);
        let _ = writeln!(out, "Style: {}", entry.style);
        let _ = writeln!(out, "Result: {}", entry.test_result);
        let _ = writeln!(
            out,
            "Tests: {}/{}, Exec Time (ms): {}, LoC: {}",
            entry.passed_count,
            entry.total_tests,
            exec_time(entry),
            code_lines(entry)
        );
        let _ = writeln!(
            out,
            "Gen Time (s): {}, Tokens (P/C): {}/{}",
            gen_time(entry),
            prompt_tokens(entry),
            completion_tokens(entry)
        );
        let _ = writeln!(out, "{:-<70}", "");
        let _ = writeln!(out, "Prompt:\n{}", entry.full_prompt);
        let _ = writeln!(out, "{:-<70}", "");
        let _ = writeln!(out, "Response:\n{}", entry.full_response);
        let _ = writeln!(out);
    }
    out
}

fn write_file(path: &Path, contents: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)
}

/// Writes nothing for an empty session.
pub fn save_session_log(files: &SessionFiles, entries: &[SessionLogEntry]) -> io::Result<bool> {
    if entries.is_empty() {
        return Ok(false);
    }
    write_file(&files.log_path, &render_session_log(&files.timestamp, entries))?;
    Ok(true)
}

pub fn save_csv(files: &SessionFiles, entries: &[SessionLogEntry]) -> io::Result<bool> {
    if entries.is_empty() {
        return Ok(false);
    }
    write_file(&files.csv_path, &render_csv(entries))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use evalburn_core::{EvalMetrics, GenerationStats, SessionLog};

    fn entries() -> Vec<SessionLogEntry> {
        vec![
            SessionLogEntry::new(
                "Two Sum",
                "qwen2.5-coder:7b",
                "Code Only",
                &EvalMetrics::completed(3, 3, 0.123456, 7),
                Some(GenerationStats {
                    elapsed_seconds: 2.5,
                    prompt_tokens: 40,
                    completion_tokens: 120,
                }),
                "Solve it, \"quickly\".".to_string(),
                "```python\nclass Solution: ...\n```".to_string(),
            ),
            SessionLogEntry::new(
                "Same Tree",
                "qwen2.5-coder:7b",
                "Code Only",
                &EvalMetrics::parsing_failure(2),
                None,
                "Compare, trees".to_string(),
                "An error occurred: boom".to_string(),
            ),
        ]
    }

    #[test]
    fn test_csv_header_and_not_available_fields() {
        let csv = render_csv(&entries());
        let lines: Vec<&str> = csv.split("\r\n").collect();
        assert_eq!(lines[0], CSV_HEADER.join(","));
        assert_eq!(
            lines[1],
            "Two Sum,qwen2.5-coder:7b,Code Only,Passed 3/3,3,3,0.1235,7,2.50,40,120"
        );
        assert_eq!(
            lines[2],
            "Same Tree,qwen2.5-coder:7b,Code Only,Code Parsing Failed,0,2,N/A,N/A,N/A,N/A,N/A"
        );
    }

    #[test]
    fn test_csv_excludes_prompt_and_response() {
        let csv = render_csv(&entries());
        assert!(!csv.contains("quickly"));
        assert!(!csv.contains("An error occurred"));
    }

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_field("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn test_session_log_keeps_full_text() {
        let log = render_session_log("20250101_120000", &entries());
        assert!(log.starts_with("evalburn Session Log - 20250101_120000"));
        assert!(log.contains("Solve it, \"quickly\"."));
        assert!(log.contains("An error occurred: boom"));
        assert!(log.contains("Run 2: Same Tree"));
    }

    #[test]
    fn test_table_and_summary() {
        let table = render_table(&entries());
        assert!(table.contains("Passed 3/3"));
        assert!(table.contains("Code Parsing Failed"));

        let mut log = SessionLog::new();
        for entry in entries() {
            log.append(entry);
        }
        let summary = render_summary(&log.summary());
        assert!(summary.contains("Tests passed:  3/5"));
        assert!(summary.contains("Pass rate:     50.0%"));
    }

    #[test]
    fn test_files_are_written_under_log_dir() {
        let dir = tempfile::tempdir().unwrap();
        let files = SessionFiles::new(&dir.path().join("logs"), "20250101_120000");

        assert!(save_session_log(&files, &entries()).unwrap());
        assert!(save_csv(&files, &entries()).unwrap());
        assert!(files.log_path.ends_with("session_log_20250101_120000.txt"));
        assert!(fs::read_to_string(&files.csv_path).unwrap().starts_with("problem,model"));
    }

    #[test]
    fn test_empty_session_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let files = SessionFiles::new(dir.path(), "20250101_120000");
        assert!(!save_session_log(&files, &[]).unwrap());
        assert!(!save_csv(&files, &[]).unwrap());
        assert!(!files.log_path.exists());
    }
}
