//! Identity matching for imported records.

/// How an incoming record was matched to a local one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome<T> {
    ByExternalId(T),
    ByNaturalKey(T),
    Unmatched,
}

impl<T> MatchOutcome<T> {
    pub fn into_matched(self) -> Option<T> {
        match self {
            MatchOutcome::ByExternalId(t) | MatchOutcome::ByNaturalKey(t) => Some(t),
            MatchOutcome::Unmatched => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            MatchOutcome::ByExternalId(_) => "external_id",
            MatchOutcome::ByNaturalKey(_) => "natural_key",
            MatchOutcome::Unmatched => "unmatched",
        }
    }
}

/// Resolve a local match: a record carrying the incoming external id wins;
/// only when there is none is the natural key (SKU, name) consulted.
///
/// The natural-key lookup is fallible so that store errors propagate.
pub fn match_record<T, E>(
    by_external_id: Option<T>,
    by_natural_key: impl FnOnce() -> Result<Option<T>, E>,
) -> Result<MatchOutcome<T>, E> {
    if let Some(found) = by_external_id {
        return Ok(MatchOutcome::ByExternalId(found));
    }
    Ok(match by_natural_key()? {
        Some(found) => MatchOutcome::ByNaturalKey(found),
        None => MatchOutcome::Unmatched,
    })
}
