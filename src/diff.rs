/// Report whether two normalized configurations differ
///
/// Plain byte equality: normalization is the only tolerance mechanism,
/// the comparison itself does no fuzzy matching. Total over all inputs,
/// including empty texts.
pub fn has_changed(candidate: &str, previous: &str) -> bool {
    candidate != previous
}
