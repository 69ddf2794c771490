use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::models::{AggregateStats, LabelCount, ResponseRecord, SurveyField};

fn write_breakdown(output: &mut String, title: &str, entries: &[LabelCount], empty: &str) {
    let _ = writeln!(output);
    let _ = writeln!(output, "## {title}");

    if entries.is_empty() {
        let _ = writeln!(output, "{empty}");
        return;
    }

    let total: usize = entries.iter().map(|entry| entry.count).sum();
    for entry in entries {
        let share = 100.0 * entry.count as f64 / total as f64;
        let _ = writeln!(
            output,
            "- {}: {} ({:.0}%)",
            entry.label, entry.count, share
        );
    }
}

fn rating_label(record: &ResponseRecord) -> String {
    record
        .rating()
        .map_or_else(|| "N/A".to_string(), |value| value.to_string())
}

pub fn build_report(
    source: &str,
    generated_at: DateTime<Utc>,
    stats: &AggregateStats,
    records: &[ResponseRecord],
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Foodie Survey Report");
    let _ = writeln!(
        output,
        "Generated from {} at {}",
        source,
        generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Summary");
    let _ = writeln!(output, "- Total responses: {}", stats.total_responses);
    let _ = writeln!(
        output,
        "- Download interest: {}%",
        stats.download_interest_percent
    );
    let _ = writeln!(output, "- Average utility: {:.1}", stats.average_utility);
    let _ = writeln!(output, "- Responses today: {}", stats.today_responses);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Perceived Utility");
    if stats.utility_histogram.is_empty() {
        let _ = writeln!(output, "No utility ratings recorded.");
    } else {
        for entry in &stats.utility_histogram {
            let _ = writeln!(output, "- {} ⭐: {}", entry.label, entry.count);
        }
    }

    write_breakdown(
        &mut output,
        "Download Intent",
        &stats.download_breakdown,
        "No download answers recorded.",
    );
    write_breakdown(
        &mut output,
        "Usage Frequency",
        &stats.frequency_breakdown,
        "No frequency answers recorded.",
    );
    write_breakdown(
        &mut output,
        "Apps In Use",
        &stats.app_mentions,
        "No apps mentioned.",
    );
    write_breakdown(
        &mut output,
        "Attractive Features",
        &stats.feature_mentions,
        "No features mentioned.",
    );

    let mut recent: Vec<&ResponseRecord> = records.iter().collect();
    recent.sort_by(|a, b| b.received_at.cmp(&a.received_at));

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Responses");
    if recent.is_empty() {
        let _ = writeln!(output, "No responses recorded.");
    } else {
        let _ = writeln!(output, "| Date | Utility | Download |");
        let _ = writeln!(output, "|------|---------|----------|");
        for record in recent.iter().take(10) {
            let intent = record
                .download_intent()
                .map_or_else(|| "N/A".to_string(), |intent| intent.to_string());
            let _ = writeln!(
                output,
                "| {} | {} | {} |",
                record.received_at.format("%Y-%m-%d"),
                rating_label(record),
                intent
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Feedback");

    let feedback: Vec<(&ResponseRecord, &str)> = recent
        .into_iter()
        .filter_map(|record| {
            record
                .text(SurveyField::Suggestions)
                .or_else(|| record.text(SurveyField::AdditionalComments))
                .map(|text| (record, text))
        })
        .take(5)
        .collect();

    if feedback.is_empty() {
        let _ = writeln!(output, "No suggestions or comments yet.");
    } else {
        for (record, text) in feedback {
            let _ = writeln!(
                output,
                "- {} (utility {}): {}",
                record.received_at.format("%Y-%m-%d"),
                rating_label(record),
                text
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DownloadIntent, FieldValue};
    use crate::stats::{aggregate, InterestPolicy};
    use chrono::TimeZone;

    fn record(day: u32, fields: Vec<(SurveyField, FieldValue)>) -> ResponseRecord {
        ResponseRecord {
            id: format!("msg-{day}"),
            subject: "New submission".to_string(),
            received_at: Utc.with_ymd_and_hms(2026, 2, day, 10, 0, 0).unwrap(),
            raw_body: String::new(),
            fields: fields.into_iter().collect(),
        }
    }

    #[test]
    fn empty_report_has_placeholders() {
        let stats = aggregate(&[], &InterestPolicy::default());
        let report = build_report("inbox", Utc::now(), &stats, &[]);
        assert!(report.contains("- Total responses: 0"));
        assert!(report.contains("No utility ratings recorded."));
        assert!(report.contains("No responses recorded."));
        assert!(report.contains("No suggestions or comments yet."));
    }

    #[test]
    fn recent_responses_include_records_without_text() {
        let mut records: Vec<ResponseRecord> = (1..=12)
            .map(|day| record(day, vec![(SurveyField::PerceivedUtility, FieldValue::Rating(day))]))
            .collect();
        records.push(record(
            20,
            vec![(SurveyField::WouldDownload, FieldValue::Category(DownloadIntent::Maybe))],
        ));
        let stats = aggregate(&records, &InterestPolicy::default());
        let report = build_report("inbox", Utc::now(), &stats, &records);

        let start = report.find("## Recent Responses").unwrap();
        let end = report.find("## Recent Feedback").unwrap();
        let section = &report[start..end];
        assert!(section.contains("| 2026-02-20 | N/A | Maybe |"));
        assert!(section.contains("| 2026-02-12 | 12 | N/A |"));
        assert!(section.contains("| 2026-02-04 | 4 | N/A |"));
        assert!(!section.contains("| 2026-02-03 |"));
        assert_eq!(section.matches("| 2026-02-").count(), 10);
    }

    #[test]
    fn report_lists_breakdowns_and_latest_feedback_first() {
        let records = vec![
            record(
                3,
                vec![
                    (SurveyField::PerceivedUtility, FieldValue::Rating(8)),
                    (SurveyField::WouldDownload, FieldValue::Category(DownloadIntent::Definitely)),
                    (SurveyField::Suggestions, FieldValue::Text("Más filtros".to_string())),
                ],
            ),
            record(
                5,
                vec![
                    (SurveyField::WouldDownload, FieldValue::Category(DownloadIntent::No)),
                    (SurveyField::AdditionalComments, FieldValue::Text("Buena idea".to_string())),
                ],
            ),
        ];
        let stats = aggregate(&records, &InterestPolicy::default());
        let report = build_report("export.json", Utc::now(), &stats, &records);

        assert!(report.contains("- Download interest: 50%"));
        assert!(report.contains("- 8 ⭐: 1"));
        assert!(report.contains("- Definitely: 1 (50%)"));

        let newest = report.find("Buena idea").unwrap();
        let oldest = report.find("Más filtros").unwrap();
        assert!(newest < oldest);
        assert!(report.contains("- 2026-02-05 (utility N/A): Buena idea"));
    }
}
