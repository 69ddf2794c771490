/// Splits a message body into trimmed, non-empty lines in their original order.
pub fn tokenize(body: &str) -> Vec<&str> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}
