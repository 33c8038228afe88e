use comment_sentiment_core::{
    models::ResultRow,
    report::LabelCount,
    table::UploadedTable,
};

const PREVIEW_CHARS: usize = 50;
const BAR_WIDTH: usize = 40;

pub fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// One line per comment, as shown while a live run is classifying.
pub fn live_row(row: &ResultRow) -> String {
    let text = row.comment.as_ref().map(|c| c.text.as_str()).unwrap_or(row.normalized.as_str());
    format!("{} -> {} ({:.2})", preview(&single_line(text), PREVIEW_CHARS), row.label(), row.score())
}

pub fn results_table(rows: &[ResultRow], limit: usize) -> String {
    let mut out = format!("{:>4}  {:<9} {:>6}  {}\n", "#", "sentiment", "score", "clean_comment");
    for (index, row) in rows.iter().take(limit).enumerate() {
        out.push_str(&format!(
            "{:>4}  {:<9} {:>6.3}  {}\n",
            index + 1,
            row.label(),
            row.score(),
            preview(row.normalized.as_str(), PREVIEW_CHARS),
        ));
    }
    if rows.len() > limit {
        out.push_str(&format!("  ... {} more rows\n", rows.len() - limit));
    }
    out
}

pub fn table_head(table: &UploadedTable, limit: usize) -> String {
    let mut headers: Vec<&str> = table.headers().iter().map(String::as_str).collect();
    if table.derived_clean().is_some() {
        headers.push("clean_comment");
    }

    let mut out = headers.join(" | ");
    out.push('\n');
    for (index, record) in table.records().iter().take(limit).enumerate() {
        let mut cells: Vec<String> = (0..table.headers().len())
            .map(|column| preview(&single_line(record.get(column).map(String::as_str).unwrap_or_default()), 30))
            .collect();
        if let Some(derived) = table.derived_clean() {
            cells.push(preview(&derived[index], 30));
        }
        out.push_str(&cells.join(" | "));
        out.push('\n');
    }
    out
}

/// Horizontal bars standing in for the pie chart.
pub fn distribution_chart(distribution: &[LabelCount]) -> String {
    let width = distribution.iter().map(|entry| entry.label.len()).max().unwrap_or(0);

    distribution.iter()
        .map(|entry| {
            let bar = "#".repeat((entry.share * BAR_WIDTH as f64).round() as usize);
            format!("{:<width$}  {:<bar_width$} {:>5.1}% ({})\n", entry.label, bar, entry.share * 100.0, entry.count, width = width, bar_width = BAR_WIDTH)
        })
        .collect()
}

pub fn word_cloud(words: &[(String, usize)]) -> String {
    if words.is_empty() {
        return "(no words)\n".to_owned();
    }

    let max = words[0].1.max(1);
    words.iter()
        .map(|(word, count)| format!("{:<16} {:<20} {}\n", word, "*".repeat((count * 20 + max - 1) / max), count))
        .collect()
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
