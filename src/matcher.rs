//! Keyword-driven detection of survey fields in notification text.
//!
//! Matching is substring based and case/accent insensitive, so a label such
//! as "¿Qué Características te atraen?" and a Formspree key such as
//! `caracteristicasAtractivas` both land on the same field. Anything that
//! wants stricter matching can provide its own [`FieldMatcher`].

use std::collections::BTreeMap;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::models::{SurveyField, ValueShape};

/// Raw, not yet normalized text found for each detected field.
pub type RawFields = BTreeMap<SurveyField, String>;

pub trait FieldMatcher: Sync {
    fn match_fields(&self, lines: &[&str]) -> RawFields;
}

#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    separators: Vec<char>,
}

impl Default for KeywordMatcher {
    fn default() -> Self {
        Self {
            separators: vec![':', '='],
        }
    }
}

impl KeywordMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value for the label on `lines[index]`: the text after the first
    /// separator, or the whole next line when nothing follows it. A rating
    /// label without a separator keeps its own line when it carries digits.
    fn value_at<'a>(
        &self,
        shape: ValueShape,
        lines: &[&'a str],
        index: usize,
    ) -> Option<&'a str> {
        let line = lines[index];
        match line.find(|c: char| self.separators.contains(&c)) {
            Some(pos) => {
                let sep_len = line[pos..].chars().next().map_or(1, char::len_utf8);
                let after = line[pos + sep_len..].trim();
                if !after.is_empty() {
                    return Some(after);
                }
            }
            None if shape == ValueShape::Rating && line.chars().any(|c| c.is_ascii_digit()) => {
                return Some(line);
            }
            None => {}
        }

        lines
            .get(index + 1)
            .copied()
            .map(str::trim)
            .filter(|next| !next.is_empty())
    }
}

impl FieldMatcher for KeywordMatcher {
    fn match_fields(&self, lines: &[&str]) -> RawFields {
        let folded: Vec<String> = lines.iter().map(|line| fold(line)).collect();
        let mut fields = RawFields::new();

        for field in SurveyField::ALL {
            for (index, line) in folded.iter().enumerate() {
                if !matches_field(field, line) {
                    continue;
                }
                if let Some(value) = self.value_at(field.shape(), lines, index) {
                    fields.insert(field, value.to_string());
                    break;
                }
            }
        }

        fields
    }
}

/// Lowercases and strips diacritics so patterns can be written unaccented.
pub fn fold(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

pub fn matches_field(field: SurveyField, folded_line: &str) -> bool {
    field
        .patterns()
        .iter()
        .any(|fragments| fragments.iter().all(|fragment| folded_line.contains(fragment)))
}
