use std::io::Write;

use chrono::SecondsFormat;

use super::query::QueueView;

const HEADER: [&str; 12] = [
    "rank",
    "subject_id",
    "name",
    "reference",
    "list_type",
    "priority",
    "status",
    "callback_status",
    "callback_at",
    "attempts",
    "agent",
    "notes",
];

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Write the ranked view as a call sheet, one row per entry in call order.
pub fn write_csv<W: Write>(view: &QueueView, writer: W) -> Result<(), ExportError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(HEADER)?;

    for (index, row) in view.entries.iter().enumerate() {
        let entry = &row.entry;
        let (name, reference) = row
            .subject
            .as_ref()
            .map(|subject| (subject.full_name(), subject.reference.clone()))
            .unwrap_or_default();

        csv.write_record([
            (index + 1).to_string(),
            entry.subject_id.to_string(),
            name,
            reference,
            row.type_display.to_string(),
            entry.priority.label().to_string(),
            entry.status.label().to_string(),
            row.callback_status.label().to_string(),
            entry
                .callback_at
                .map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true))
                .unwrap_or_default(),
            format!("{}/{}", entry.call_attempts, entry.max_attempts),
            row.agent_name.clone().unwrap_or_default(),
            entry.notes.clone().unwrap_or_default(),
        ])?;
    }

    csv.flush()?;
    Ok(())
}
