use console::{measure_text_width, Style};

use crate::executor::{ResultTable, SqlValue};
use crate::query::{CriteriaStore, Dialect, Query};
use crate::settings::Output;

pub const TREE_BRANCH: char = '\u{251C}';
pub const TREE_END: char = '\u{2514}';
pub const TREE_HORIZ: char = '\u{2500}';
pub const TREE_VERT: char = '\u{2502}';

const TREE_PREFIX_WIDTH: usize = 4;
const VALUE_COLUMN: usize = 22;

fn tree_branch() -> String {
    dim()
        .apply_to(format!("{}{}{} ", TREE_BRANCH, TREE_HORIZ, TREE_HORIZ))
        .to_string()
}

fn tree_end() -> String {
    dim()
        .apply_to(format!("{}{}{} ", TREE_END, TREE_HORIZ, TREE_HORIZ))
        .to_string()
}

pub fn dim() -> Style {
    Style::new().dim()
}

fn blue() -> Style {
    Style::new().blue()
}

fn cyan() -> Style {
    Style::new().cyan()
}

fn green() -> Style {
    Style::new().green()
}

fn red() -> Style {
    Style::new().red()
}

fn bold() -> Style {
    Style::new().bold()
}

fn db_prefix() -> String {
    blue().apply_to("[DB]").to_string()
}

fn query_prefix() -> String {
    cyan().apply_to("[QUERY]").to_string()
}

pub fn pad_label(label: &str, depth: usize) -> String {
    let prefix_width = depth * TREE_PREFIX_WIDTH;
    let target_width = VALUE_COLUMN.saturating_sub(prefix_width);
    let current_width = measure_text_width(label);
    if current_width < target_width {
        format!("{}{}", label, " ".repeat(target_width - current_width))
    } else {
        format!("{} ", label)
    }
}

/// Shortens `text` to at most `width` characters, marking the cut with `...`.
pub fn truncate_cell(text: &str, width: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= width {
        return flat;
    }
    let keep = width.saturating_sub(3);
    format!("{}...", flat.chars().take(keep).collect::<String>())
}

fn tree_lines(entries: &[(&str, String)]) -> Vec<String> {
    let count = entries.len();
    entries
        .iter()
        .enumerate()
        .map(|(i, (label, value))| {
            let branch = if i + 1 == count {
                tree_end()
            } else {
                tree_branch()
            };
            format!("{}{}{}", branch, pad_label(label, 1), value)
        })
        .collect()
}

fn join_or_any<T: ToString>(items: impl IntoIterator<Item = T>) -> String {
    let joined = items
        .into_iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    if joined.is_empty() {
        dim().apply_to("any").to_string()
    } else {
        joined
    }
}

pub fn render_criteria(criteria: &CriteriaStore) -> String {
    let flag = |on: bool| {
        if on {
            green().apply_to("yes").to_string()
        } else {
            dim().apply_to("no").to_string()
        }
    };

    let string_match = match criteria.string_match() {
        Some(needle) => format!(
            "\"{}\" {}",
            needle,
            dim().apply_to(format!(
                "({}, {})",
                criteria.search_scope(),
                if criteria.case_sensitive() {
                    "case-sensitive"
                } else {
                    "case-insensitive"
                }
            ))
        ),
        None => dim().apply_to("none").to_string(),
    };
    let dates = match criteria.date_range() {
        Some((start, end)) => format!("{start} .. {end}"),
        None => dim().apply_to("any").to_string(),
    };

    let entries = [
        ("platforms", join_or_any(criteria.platforms())),
        ("subplatforms", join_or_any(criteria.subplatforms())),
        ("with labels", join_or_any(criteria.label_inclusion())),
        ("without labels", join_or_any(criteria.label_exclusion())),
        ("string match", string_match),
        ("language", join_or_any(criteria.language())),
        ("dates", dates),
        ("author", join_or_any(criteria.author())),
        ("merge platform data", flag(criteria.merge_platform_data())),
        ("merge label data", flag(criteria.merge_label_data())),
    ];

    let mut lines = vec![bold().apply_to("CRITERIA").to_string()];
    lines.extend(tree_lines(&entries));
    lines.join("\n")
}

pub fn log_criteria(criteria: &CriteriaStore) {
    println!("{}", render_criteria(criteria));
}

pub fn log_query(query: &Query) {
    println!(
        "{} {} query",
        query_prefix(),
        cyan().apply_to(query.dialect())
    );
    println!("{}", query.text());
    if query.params().is_empty() {
        return;
    }
    println!("{}", bold().apply_to("PARAMS"));
    let placeholders: Vec<String> = (1..=query.params().len())
        .map(|i| match query.dialect() {
            Dialect::Postgres => format!("${i}"),
            Dialect::Sqlite => format!("?{i}"),
        })
        .collect();
    let entries: Vec<(&str, String)> = placeholders
        .iter()
        .zip(query.params())
        .map(|(p, param)| (p.as_str(), param.to_string()))
        .collect();
    for line in tree_lines(&entries) {
        println!("{line}");
    }
}

fn cell_text(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => String::new(),
        other => other.to_string(),
    }
}

/// Column-aligned rendering of the first `output.max_rows` rows.
pub fn render_table(table: &ResultTable, output: &Output) -> String {
    if table.columns().is_empty() {
        return dim().apply_to("(no rows)").to_string();
    }

    let shown = table.rows().iter().take(output.max_rows);
    let cells: Vec<Vec<String>> = shown
        .map(|row| {
            row.iter()
                .map(|v| truncate_cell(&cell_text(v), output.max_cell_width))
                .collect()
        })
        .collect();
    let headers: Vec<String> = table
        .columns()
        .iter()
        .map(|c| truncate_cell(c, output.max_cell_width))
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            cells
                .iter()
                .map(|row| measure_text_width(&row[i]))
                .chain(std::iter::once(measure_text_width(h)))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let pad = |text: &str, width: usize| {
        let current = measure_text_width(text);
        format!("{}{}", text, " ".repeat(width.saturating_sub(current)))
    };
    let separator = dim().apply_to(format!(" {} ", TREE_VERT)).to_string();

    let mut lines = Vec::with_capacity(cells.len() + 3);
    lines.push(
        headers
            .iter()
            .zip(&widths)
            .map(|(h, &w)| bold().apply_to(pad(h, w)).to_string())
            .collect::<Vec<_>>()
            .join(&separator),
    );
    let rule_width = widths.iter().sum::<usize>() + 3 * widths.len().saturating_sub(1);
    lines.push(
        dim()
            .apply_to(TREE_HORIZ.to_string().repeat(rule_width))
            .to_string(),
    );
    for row in &cells {
        lines.push(
            row.iter()
                .zip(&widths)
                .map(|(cell, &w)| pad(cell, w))
                .collect::<Vec<_>>()
                .join(&separator),
        );
    }

    let hidden = table.len().saturating_sub(output.max_rows);
    let footer = if hidden > 0 {
        format!(
            "{} rows {}",
            table.len(),
            dim().apply_to(format!("({hidden} not shown)"))
        )
    } else {
        format!("{} rows", table.len())
    };
    lines.push(footer);
    lines.join("\n")
}

pub fn print_table(table: &ResultTable, output: &Output) {
    println!("{}", render_table(table, output));
}

pub fn print_json(table: &ResultTable) {
    match serde_json::to_string_pretty(&table.to_json()) {
        Ok(json) => println!("{json}"),
        Err(e) => log_generic_error(&e.to_string()),
    }
}

pub fn log_count(count: i64) {
    println!("{} {} rows match", query_prefix(), bold().apply_to(count));
}

pub fn log_backend(backend: Dialect, target: &str) {
    println!(
        "{} connecting to {} {}",
        db_prefix(),
        cyan().apply_to(backend),
        dim().apply_to(target)
    );
}

pub fn log_migrations(applied: usize) {
    if applied == 0 {
        println!("{} schema is up to date", db_prefix());
    } else {
        println!(
            "{} applied {} migrations",
            db_prefix(),
            green().apply_to(applied)
        );
    }
}

pub fn log_generic_error(message: &str) {
    eprintln!("{} {}", red().apply_to("error:"), message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::OutputFormat;
    use console::strip_ansi_codes;

    fn output(max_rows: usize, max_cell_width: usize) -> Output {
        Output {
            format: OutputFormat::Table,
            max_rows,
            max_cell_width,
        }
    }

    #[test]
    fn test_pad_label_aligns_values() {
        assert_eq!(measure_text_width(&pad_label("platforms", 1)), VALUE_COLUMN - 4);
        assert_eq!(pad_label("a label longer than the column", 1), "a label longer than the column ");
    }

    #[test]
    fn test_truncate_cell() {
        assert_eq!(truncate_cell("short", 10), "short");
        assert_eq!(truncate_cell("line one\nline two", 40), "line one line two");
        assert_eq!(truncate_cell("abcdefghijkl", 8), "abcde...");
    }

    #[test]
    fn test_render_table_limits_rows() {
        let table = ResultTable::from_named_rows(
            (0..3)
                .map(|i| {
                    vec![
                        ("id".to_string(), SqlValue::Integer(i)),
                        ("title".to_string(), SqlValue::Null),
                    ]
                })
                .collect(),
        );
        let rendered = strip_ansi_codes(&render_table(&table, &output(2, 20))).to_string();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("id"));
        assert!(lines[0].contains("title"));
        assert_eq!(lines[4], "3 rows (1 not shown)");
    }

    #[test]
    fn test_render_empty_table() {
        let rendered = render_table(&ResultTable::default(), &output(10, 10));
        assert_eq!(strip_ansi_codes(&rendered), "(no rows)");
    }

    #[test]
    fn test_render_criteria_lists_filters() {
        let criteria = CriteriaStore::builder()
            .platform("reddit")
            .string_match("vaccine")
            .build()
            .unwrap();
        let rendered = strip_ansi_codes(&render_criteria(&criteria)).to_string();
        assert!(rendered.starts_with("CRITERIA"));
        assert!(rendered.contains("reddit"));
        assert!(rendered.contains("\"vaccine\" (all, case-insensitive)"));
        assert_eq!(rendered.lines().count(), 11);
    }
}
