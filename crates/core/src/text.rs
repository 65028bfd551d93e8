/// Normalized grouping/lookup key for a material or work name.
///
/// Trim + Unicode lower-case, nothing broader. Near-duplicate names that
/// differ by trailing punctuation or encoding intentionally stay distinct;
/// widening the match silently would change which rows fuse into one
/// bucket.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_lowercases() {
        assert_eq!(normalize_name("  Кабель ВВГ  "), "кабель ввг");
        assert_eq!(normalize_name("Cement M500"), "cement m500");
    }

    #[test]
    fn punctuation_is_preserved() {
        assert_ne!(normalize_name("Кабель."), normalize_name("Кабель"));
    }

    #[test]
    fn empty_stays_empty() {
        assert_eq!(normalize_name("   "), "");
    }
}
