use std::collections::BTreeMap;

use chrono::{DateTime, Local, TimeZone};

use crate::models::{AggregateStats, DownloadIntent, LabelCount, ResponseRecord, SurveyField};

/// Which download-intent buckets count as interest in the app.
#[derive(Debug, Clone)]
pub struct InterestPolicy {
    pub positive: Vec<DownloadIntent>,
}

impl Default for InterestPolicy {
    fn default() -> Self {
        Self {
            positive: vec![DownloadIntent::Definitely, DownloadIntent::Maybe],
        }
    }
}

impl InterestPolicy {
    pub fn new(positive: Vec<DownloadIntent>) -> Self {
        Self { positive }
    }

    pub fn is_positive(&self, intent: DownloadIntent) -> bool {
        self.positive.contains(&intent)
    }
}

pub fn aggregate(records: &[ResponseRecord], policy: &InterestPolicy) -> AggregateStats {
    aggregate_at(records, policy, &Local::now())
}

/// Same as [`aggregate`] with an explicit "now"; the calendar day of `now`
/// in its own time zone decides which responses count as today's.
pub fn aggregate_at<Tz: TimeZone>(
    records: &[ResponseRecord],
    policy: &InterestPolicy,
    now: &DateTime<Tz>,
) -> AggregateStats {
    let total = records.len();
    let positive = records
        .iter()
        .filter_map(ResponseRecord::download_intent)
        .filter(|intent| policy.is_positive(*intent))
        .count();

    let today = now.date_naive();
    let zone = now.timezone();
    let today_responses = records
        .iter()
        .filter(|record| record.received_at.with_timezone(&zone).date_naive() == today)
        .count();

    AggregateStats {
        total_responses: total,
        download_interest_percent: percent(positive, total),
        average_utility: average_utility(records),
        today_responses,
        utility_histogram: utility_histogram(records),
        download_breakdown: tally(
            records
                .iter()
                .filter_map(ResponseRecord::download_intent)
                .map(|intent| intent.to_string()),
        ),
        frequency_breakdown: tally(
            records
                .iter()
                .filter_map(|record| record.text(SurveyField::UsageFrequency))
                .map(str::to_string),
        ),
        app_mentions: tally(
            records
                .iter()
                .flat_map(|record| record.list(SurveyField::CurrentAppsUsed))
                .cloned(),
        ),
        feature_mentions: tally(
            records
                .iter()
                .flat_map(|record| record.list(SurveyField::AttractiveFeatures))
                .cloned(),
        ),
    }
}

fn percent(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (100.0 * part as f64 / total as f64).round() as u32
}

/// Mean of positive ratings, rounded to one decimal.
pub fn average_utility(records: &[ResponseRecord]) -> f64 {
    let ratings: Vec<u32> = records
        .iter()
        .filter_map(ResponseRecord::rating)
        .filter(|rating| *rating > 0)
        .collect();

    if ratings.is_empty() {
        return 0.0;
    }

    let mean = ratings.iter().map(|r| *r as f64).sum::<f64>() / ratings.len() as f64;
    (mean * 10.0).round() / 10.0
}

pub fn utility_histogram(records: &[ResponseRecord]) -> Vec<LabelCount> {
    let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
    for rating in records.iter().filter_map(ResponseRecord::rating) {
        if rating > 0 {
            *counts.entry(rating).or_insert(0) += 1;
        }
    }

    counts
        .into_iter()
        .map(|(rating, count)| LabelCount {
            label: rating.to_string(),
            count,
        })
        .collect()
}

/// Counts labels, keeping the order in which each label was first seen.
pub fn tally(labels: impl IntoIterator<Item = String>) -> Vec<LabelCount> {
    let mut counts: Vec<LabelCount> = Vec::new();
    for label in labels {
        match counts.iter_mut().find(|entry| entry.label == label) {
            Some(entry) => entry.count += 1,
            None => counts.push(LabelCount { label, count: 1 }),
        }
    }
    counts
}
