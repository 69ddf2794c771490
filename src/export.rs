use std::io;

use crate::models::{ResponseRecord, SurveyField};

/// Writes one CSV row per record; absent fields are left empty and lists are
/// joined with "; ".
pub fn write_csv<W: io::Write>(records: &[ResponseRecord], writer: W) -> anyhow::Result<()> {
    let mut csv = csv::Writer::from_writer(writer);

    let mut header = vec!["id", "subject", "received_at"];
    header.extend(SurveyField::ALL.iter().map(|field| field.column()));
    csv.write_record(&header)?;

    for record in records {
        let mut row = vec![
            record.id.clone(),
            record.subject.clone(),
            record.received_at.to_rfc3339(),
        ];
        row.extend(SurveyField::ALL.iter().map(|field| {
            record
                .fields
                .get(field)
                .map(|value| value.to_string())
                .unwrap_or_default()
        }));
        csv.write_record(&row)?;
    }

    csv.flush()?;
    Ok(())
}

pub fn write_json<W: io::Write>(records: &[ResponseRecord], writer: W) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(writer, records)?;
    Ok(())
}
