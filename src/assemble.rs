use rayon::prelude::*;
use tracing::debug;

use crate::matcher::{fold, FieldMatcher};
use crate::models::{RawMessage, ResponseRecord};
use crate::normalize::normalize;
use crate::tokenize::tokenize;

/// Words that mark a message as a Foodie survey submission.
const ANCHORS: &[&str] = &["utilidad", "utility", "foodie"];

pub fn is_survey_submission(body: &str) -> bool {
    let folded = fold(body);
    ANCHORS.iter().any(|anchor| folded.contains(anchor))
}

pub fn assemble(message: &RawMessage, matcher: &dyn FieldMatcher) -> Option<ResponseRecord> {
    if !is_survey_submission(&message.body) {
        debug!(id = %message.id, subject = %message.subject, "skipping non-survey message");
        return None;
    }

    let lines = tokenize(&message.body);
    let fields = matcher
        .match_fields(&lines)
        .into_iter()
        .filter_map(|(field, raw)| normalize(field.shape(), &raw).map(|value| (field, value)))
        .collect();

    Some(ResponseRecord {
        id: message.id.clone(),
        subject: message.subject.clone(),
        received_at: message.received_at,
        raw_body: message.body.clone(),
        fields,
    })
}

/// Extracts every survey submission in the batch. Messages are processed in
/// parallel; the output keeps the input order.
pub fn extract_batch(messages: &[RawMessage], matcher: &dyn FieldMatcher) -> Vec<ResponseRecord> {
    let records: Vec<ResponseRecord> = messages
        .par_iter()
        .filter_map(|message| assemble(message, matcher))
        .collect();

    debug!(
        messages = messages.len(),
        records = records.len(),
        "extracted survey responses"
    );
    records
}
