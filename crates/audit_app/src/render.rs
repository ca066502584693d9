use audit_core::{AppViewModel, Busy, JobRowView, RowAction, SortDirection};

const HEADERS: [&str; 5] = ["Website", "URL", "Created", "Status", "Action"];

/// Text rendition of the view, one entry per line.
pub fn render(view: &AppViewModel) -> Vec<String> {
    let mut lines = Vec::new();

    match view.busy {
        Busy::Idle => {}
        Busy::Submitting => lines.push("Submitting audit...".to_string()),
        Busy::AwaitingFirstStatus => lines.push("Waiting for the audit to start...".to_string()),
    }
    if let Some(error) = &view.error {
        lines.push(format!("Error: {error}"));
    }
    if let Some(success) = &view.success {
        lines.push(success.clone());
    }
    if let Some(job) = &view.active_job {
        lines.push(format!("Audit ID: {}  Status: {}", job.job_id, job.status));
    }
    if let Some(offer) = &view.download_offer {
        lines.push(format!(
            "Result ready as {}; type `download` to save it",
            offer.file_name
        ));
    }
    if view.downloads_in_flight > 0 {
        lines.push(format!("Downloading {} file(s)...", view.downloads_in_flight));
    }
    if let Some(path) = &view.last_saved {
        lines.push(format!("Saved: {path}"));
    }

    lines.push(ledger_heading(view));
    if view.rows.is_empty() {
        if !view.ledger_loading {
            lines.push("No audits yet.".to_string());
        }
        return lines;
    }
    lines.extend(table(&view.rows));
    lines
}

fn ledger_heading(view: &AppViewModel) -> String {
    let mut heading = format!("Audits ({})", view.job_count);
    if let Some(key) = view.sort.key {
        let arrow = match view.sort.direction {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        };
        heading.push_str(&format!(" sorted by {} {arrow}", key.as_str()));
    }
    if view.ledger_loading {
        heading.push_str(" loading...");
    }
    heading
}

fn table(rows: &[JobRowView]) -> Vec<String> {
    let cells: Vec<[String; 5]> = rows
        .iter()
        .map(|row| {
            let action = if row.action == RowAction::Download {
                format!("{} (download {})", row.action.label(), row.job_id)
            } else {
                row.action.label().to_string()
            };
            [
                row.website_name.clone(),
                row.url_label.clone(),
                row.created_label.clone(),
                row.status_label.clone(),
                action,
            ]
        })
        .collect();

    let mut widths = HEADERS.map(|header| header.chars().count());
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let format_row = |row: &[&str]| -> String {
        row.iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![format_row(&HEADERS)];
    lines.extend(cells.iter().map(|row| {
        let borrowed: Vec<&str> = row.iter().map(String::as_str).collect();
        format_row(&borrowed)
    }));
    lines
}
