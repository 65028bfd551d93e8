use std::cmp::Ordering;

use crate::text::normalize_name;

/// Case-insensitive name comparison under Russian collation.
///
/// The Cyrillic block is already alphabetical in code-point order except
/// for `ё` (U+0451), which Unicode places after `я`. Russian dictionaries
/// put it between `е` and `ж`, so it gets a fractional rank just above
/// `е`. Everything non-Cyrillic keeps plain code-point order, which also
/// sorts digits and Latin before Cyrillic the way exported spreadsheets
/// usually arrive.
pub fn collate_names(a: &str, b: &str) -> Ordering {
    let a = normalize_name(a);
    let b = normalize_name(b);

    let mut ia = a.chars().map(char_rank);
    let mut ib = b.chars().map(char_rank);
    loop {
        match (ia.next(), ib.next()) {
            (Some(ra), Some(rb)) => match ra.partial_cmp(&rb) {
                Some(Ordering::Equal) | None => continue,
                Some(ord) => return ord,
            },
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (None, None) => return Ordering::Equal,
        }
    }
}

fn char_rank(c: char) -> f64 {
    match c {
        'ё' => 'е' as u32 as f64 + 0.5,
        _ => c as u32 as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yo_sorts_between_ye_and_zhe() {
        let mut names = vec!["Жесть", "Ёлка", "Ель"];
        names.sort_by(|a, b| collate_names(a, b));
        assert_eq!(names, vec!["Ель", "Ёлка", "Жесть"]);
    }

    #[test]
    fn case_insensitive() {
        assert_eq!(collate_names("КАБЕЛЬ", "кабель"), Ordering::Equal);
        assert_eq!(collate_names("кабель ", " Кабель"), Ordering::Equal);
    }

    #[test]
    fn cyrillic_alphabetical() {
        let mut names = vec!["Цемент", "Арматура", "Кабель", "Бетон"];
        names.sort_by(|a, b| collate_names(a, b));
        assert_eq!(names, vec!["Арматура", "Бетон", "Кабель", "Цемент"]);
    }
}
