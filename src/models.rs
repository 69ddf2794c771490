use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A decoded notification email, ready for extraction.
#[derive(Debug, Clone)]
pub struct RawMessage {
    pub id: String,
    pub subject: String,
    pub received_at: DateTime<Utc>,
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SurveyField {
    PerceivedUtility,
    CurrentAppsUsed,
    AttractiveFeatures,
    WouldDownload,
    UsageFrequency,
    ShouldDevelop,
    Suggestions,
    AdditionalComments,
}

/// How the raw text of a field is turned into a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    Rating,
    StringList,
    FreeText,
    Category,
}

const UTILITY_PATTERNS: &[&[&str]] = &[
    &["utilidad", "perdida"],
    &["utilidad", "percibida"],
    &["utility", "lost"],
    &["utility", "perceived"],
];
const APPS_PATTERNS: &[&[&str]] = &[&["apps", "usas"], &["apps", "use"]];
const FEATURE_PATTERNS: &[&[&str]] = &[&["caracteristica"], &["feature"]];
const DOWNLOAD_PATTERNS: &[&[&str]] = &[&["descargar", "foodie"], &["download", "foodie"]];
const FREQUENCY_PATTERNS: &[&[&str]] = &[&["frecuencia"], &["frequency"]];
const DEVELOP_PATTERNS: &[&[&str]] = &[&["desarrollar", "foodie"], &["develop", "foodie"]];
const SUGGESTION_PATTERNS: &[&[&str]] = &[&["sugerencia"], &["suggestion"]];
const COMMENT_PATTERNS: &[&[&str]] = &[&["comentario", "adicional"], &["additional", "comment"]];

impl SurveyField {
    pub const ALL: [SurveyField; 8] = [
        SurveyField::PerceivedUtility,
        SurveyField::CurrentAppsUsed,
        SurveyField::AttractiveFeatures,
        SurveyField::WouldDownload,
        SurveyField::UsageFrequency,
        SurveyField::ShouldDevelop,
        SurveyField::Suggestions,
        SurveyField::AdditionalComments,
    ];

    pub fn shape(self) -> ValueShape {
        match self {
            SurveyField::PerceivedUtility => ValueShape::Rating,
            SurveyField::CurrentAppsUsed | SurveyField::AttractiveFeatures => {
                ValueShape::StringList
            }
            SurveyField::WouldDownload => ValueShape::Category,
            SurveyField::UsageFrequency
            | SurveyField::ShouldDevelop
            | SurveyField::Suggestions
            | SurveyField::AdditionalComments => ValueShape::FreeText,
        }
    }

    /// Alternative phrasings; every fragment of one alternative must appear
    /// in the folded line. Fragments are lowercase and unaccented.
    pub fn patterns(self) -> &'static [&'static [&'static str]] {
        match self {
            SurveyField::PerceivedUtility => UTILITY_PATTERNS,
            SurveyField::CurrentAppsUsed => APPS_PATTERNS,
            SurveyField::AttractiveFeatures => FEATURE_PATTERNS,
            SurveyField::WouldDownload => DOWNLOAD_PATTERNS,
            SurveyField::UsageFrequency => FREQUENCY_PATTERNS,
            SurveyField::ShouldDevelop => DEVELOP_PATTERNS,
            SurveyField::Suggestions => SUGGESTION_PATTERNS,
            SurveyField::AdditionalComments => COMMENT_PATTERNS,
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            SurveyField::PerceivedUtility => "perceived_utility",
            SurveyField::CurrentAppsUsed => "current_apps_used",
            SurveyField::AttractiveFeatures => "attractive_features",
            SurveyField::WouldDownload => "would_download",
            SurveyField::UsageFrequency => "usage_frequency",
            SurveyField::ShouldDevelop => "should_develop",
            SurveyField::Suggestions => "suggestions",
            SurveyField::AdditionalComments => "additional_comments",
        }
    }
}

/// Display bucket for the "would you download Foodie" answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
pub enum DownloadIntent {
    Definitely,
    Maybe,
    No,
    Other,
}

impl fmt::Display for DownloadIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DownloadIntent::Definitely => "Definitely",
            DownloadIntent::Maybe => "Maybe",
            DownloadIntent::No => "No",
            DownloadIntent::Other => "Other",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Rating(u32),
    List(Vec<String>),
    Text(String),
    Category(DownloadIntent),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Rating(value) => write!(f, "{value}"),
            FieldValue::List(items) => f.write_str(&items.join("; ")),
            FieldValue::Text(text) => f.write_str(text),
            FieldValue::Category(intent) => write!(f, "{intent}"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseRecord {
    pub id: String,
    pub subject: String,
    pub received_at: DateTime<Utc>,
    pub raw_body: String,
    pub fields: BTreeMap<SurveyField, FieldValue>,
}

impl ResponseRecord {
    pub fn rating(&self) -> Option<u32> {
        match self.fields.get(&SurveyField::PerceivedUtility) {
            Some(FieldValue::Rating(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn download_intent(&self) -> Option<DownloadIntent> {
        match self.fields.get(&SurveyField::WouldDownload) {
            Some(FieldValue::Category(intent)) => Some(*intent),
            _ => None,
        }
    }

    pub fn list(&self, field: SurveyField) -> &[String] {
        match self.fields.get(&field) {
            Some(FieldValue::List(items)) => items,
            _ => &[],
        }
    }

    pub fn text(&self, field: SurveyField) -> Option<&str> {
        match self.fields.get(&field) {
            Some(FieldValue::Text(text)) => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateStats {
    pub total_responses: usize,
    pub download_interest_percent: u32,
    pub average_utility: f64,
    pub today_responses: usize,
    pub utility_histogram: Vec<LabelCount>,
    pub download_breakdown: Vec<LabelCount>,
    pub frequency_breakdown: Vec<LabelCount>,
    pub app_mentions: Vec<LabelCount>,
    pub feature_mentions: Vec<LabelCount>,
}
