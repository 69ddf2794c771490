use unicode_normalization::UnicodeNormalization;

use crate::models::{DownloadIntent, FieldValue, ValueShape};

const DEFINITELY: &[&str] = &["sí", "definitivamente", "yes", "definitely"];
const MAYBE: &[&str] = &["tal vez", "quizá", "quizas", "maybe"];
const NO: &[&str] = &["no"];

/// Turns a raw matched substring into a typed value. `None` means the field
/// is treated as absent.
pub fn normalize(shape: ValueShape, raw: &str) -> Option<FieldValue> {
    match shape {
        ValueShape::Rating => parse_rating(raw).map(FieldValue::Rating),
        ValueShape::StringList => {
            let items = split_list(raw);
            (!items.is_empty()).then_some(FieldValue::List(items))
        }
        ValueShape::FreeText => {
            let text = raw.trim();
            (!text.is_empty()).then(|| FieldValue::Text(text.to_string()))
        }
        ValueShape::Category => {
            (!raw.trim().is_empty()).then(|| FieldValue::Category(classify_intent(raw)))
        }
    }
}

/// First run of ASCII digits in the text.
pub fn parse_rating(raw: &str) -> Option<u32> {
    let start = raw.find(|c: char| c.is_ascii_digit())?;
    let digits: String = raw[start..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

pub fn split_list(raw: &str) -> Vec<String> {
    raw.split([',', ';'])
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn classify_intent(raw: &str) -> DownloadIntent {
    let lower = raw.trim().nfc().collect::<String>().to_lowercase();
    let has_any = |needles: &[&str]| needles.iter().any(|needle| lower.contains(needle));

    if has_any(DEFINITELY) || lower == "si" {
        DownloadIntent::Definitely
    } else if has_any(MAYBE) {
        DownloadIntent::Maybe
    } else if has_any(NO) {
        DownloadIntent::No
    } else {
        DownloadIntent::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_takes_first_digit_run() {
        assert_eq!(parse_rating(" 8 de 10"), Some(8));
        assert_eq!(parse_rating("nivel 10/10"), Some(10));
        assert_eq!(parse_rating("muy útil"), None);
    }

    #[test]
    fn malformed_rating_is_absent() {
        assert_eq!(normalize(ValueShape::Rating, "alta"), None);
        assert_eq!(
            normalize(ValueShape::Rating, "99999999999999999999"),
            None
        );
    }

    #[test]
    fn list_drops_empty_elements_and_keeps_order() {
        assert_eq!(split_list("a, b,, c ;d"), vec!["a", "b", "c", "d"]);
        assert_eq!(split_list("Rappi, Rappi"), vec!["Rappi", "Rappi"]);
        assert_eq!(normalize(ValueShape::StringList, " ,; "), None);
    }

    #[test]
    fn free_text_is_trimmed_and_empty_is_absent() {
        assert_eq!(
            normalize(ValueShape::FreeText, "  Más filtros  de precio "),
            Some(FieldValue::Text("Más filtros  de precio".to_string()))
        );
        assert_eq!(normalize(ValueShape::FreeText, "   "), None);
    }

    #[test]
    fn intent_buckets_follow_rule_order() {
        assert_eq!(classify_intent("Sí, definitivamente"), DownloadIntent::Definitely);
        assert_eq!(classify_intent("Yes!"), DownloadIntent::Definitely);
        assert_eq!(classify_intent("si"), DownloadIntent::Definitely);
        assert_eq!(classify_intent("Tal vez más adelante"), DownloadIntent::Maybe);
        assert_eq!(classify_intent("maybe later"), DownloadIntent::Maybe);
        assert_eq!(classify_intent("No lo creo"), DownloadIntent::No);
        assert_eq!(classify_intent("Depende del precio"), DownloadIntent::Other);
    }

    #[test]
    fn decomposed_accents_are_composed_before_classifying() {
        assert_eq!(classify_intent("Si\u{301}"), DownloadIntent::Definitely);
        assert_eq!(classify_intent("Quiza\u{301}s"), DownloadIntent::Maybe);
    }

    #[test]
    fn category_never_absent_for_non_empty_text() {
        assert_eq!(
            normalize(ValueShape::Category, "???"),
            Some(FieldValue::Category(DownloadIntent::Other))
        );
    }
}
