//! core/tags/util.rs
//! Small parsing helpers shared by the tag readers.

/// Parse strings like:
/// - "3" -> (Some(3), None)
/// - "3/12" -> (Some(3), Some(12))
pub(crate) fn parse_slash_pair_u32(s: Option<&str>) -> (Option<u32>, Option<u32>) {
    let Some(s) = s else { return (None, None) };
    let s = s.trim();
    if s.is_empty() {
        return (None, None);
    }

    let mut parts = s.split('/');
    let a = parts.next().and_then(|p| p.trim().parse::<u32>().ok());
    let b = parts.next().and_then(|p| p.trim().parse::<u32>().ok());
    (a, b)
}

/// Track numbers are 1-based; a tagged "0" means "not set".
pub(crate) fn parse_track_number(s: Option<&str>) -> Option<u32> {
    parse_slash_pair_u32(s).0.filter(|n| *n > 0)
}

/// Trimmed, or None if there's nothing left.
pub(crate) fn clean_text(s: &str) -> Option<String> {
    let s = s.trim().trim_matches('\0').trim();
    (!s.is_empty()).then(|| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slash_pairs() {
        assert_eq!(parse_slash_pair_u32(Some("3")), (Some(3), None));
        assert_eq!(parse_slash_pair_u32(Some(" 3 / 12 ")), (Some(3), Some(12)));
        assert_eq!(parse_slash_pair_u32(Some("")), (None, None));
        assert_eq!(parse_slash_pair_u32(Some("x/2")), (None, Some(2)));
        assert_eq!(parse_slash_pair_u32(None), (None, None));
    }

    #[test]
    fn track_number_zero_is_unset() {
        assert_eq!(parse_track_number(Some("0/10")), None);
        assert_eq!(parse_track_number(Some("7/10")), Some(7));
    }

    #[test]
    fn clean_text_drops_blank() {
        assert_eq!(clean_text("  "), None);
        assert_eq!(clean_text(" Blue Train\0"), Some("Blue Train".to_string()));
    }
}
