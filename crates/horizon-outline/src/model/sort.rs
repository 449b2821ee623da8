//! Row comparison used when sorting a table by a column.

use std::cmp::Ordering;
use std::iter::Peekable;
use std::str::Chars;

/// Prefix placed on container sort keys so they sort before leaves.
pub const CONTAINER_MARKER: char = '\0';

/// Sort direction for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Compares two sort keys in ascending order.
///
/// Keys carrying [`CONTAINER_MARKER`] come first. The marker is stripped
/// before the values are compared: keys that both parse as numbers compare
/// numerically and everything else uses [`natural_cmp`].
pub fn flexible_cmp(a: &str, b: &str) -> Ordering {
    ordered_cmp(a, b, SortOrder::Ascending)
}

/// Compares two sort keys for the given direction. Container grouping is
/// not reversed by [`SortOrder::Descending`].
pub fn ordered_cmp(a: &str, b: &str, order: SortOrder) -> Ordering {
    let (a_grouped, a_value) = split_marker(a);
    let (b_grouped, b_value) = split_marker(b);
    match (a_grouped, b_grouped) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => match order {
            SortOrder::Ascending => value_cmp(a_value, b_value),
            SortOrder::Descending => value_cmp(b_value, a_value),
        },
    }
}

fn split_marker(key: &str) -> (bool, &str) {
    match key.strip_prefix(CONTAINER_MARKER) {
        Some(rest) => (true, rest),
        None => (false, key),
    }
}

fn value_cmp(a: &str, b: &str) -> Ordering {
    if let (Some(x), Some(y)) = (parse_number(a), parse_number(b)) {
        return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
    }
    natural_cmp(a, b)
}

/// Case-insensitive comparison that ignores punctuation and whitespace and
/// compares runs of digits by numeric value ("Item 9" < "Item 10").
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();
    loop {
        skip_separators(&mut left);
        skip_separators(&mut right);
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let ordering = cmp_digit_runs(&take_digits(&mut left), &take_digits(&mut right));
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            (Some(x), Some(y)) => {
                let ordering = x.to_lowercase().cmp(y.to_lowercase());
                if ordering != Ordering::Equal {
                    return ordering;
                }
                left.next();
                right.next();
            }
        }
    }
}

fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .strip_prefix('+')
        .unwrap_or(trimmed)
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

fn skip_separators(chars: &mut Peekable<Chars<'_>>) {
    while chars
        .next_if(|c| c.is_ascii_punctuation() || c.is_whitespace())
        .is_some()
    {}
}

fn take_digits(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(c) = chars.next_if(char::is_ascii_digit) {
        digits.push(c);
    }
    digits
}

fn cmp_digit_runs(a: &str, b: &str) -> Ordering {
    let a_trim = a.trim_start_matches('0');
    let b_trim = b.trim_start_matches('0');
    a_trim
        .len()
        .cmp(&b_trim.len())
        .then_with(|| a_trim.cmp(b_trim))
        .then_with(|| a.len().cmp(&b.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_natural_numbers() {
        assert_eq!(natural_cmp("Item 9", "Item 10"), Ordering::Less);
        assert_eq!(natural_cmp("Item 10", "Item 9"), Ordering::Greater);
    }

    #[test]
    fn test_natural_case_insensitive() {
        assert_eq!(natural_cmp("acrobatics", "Boxing"), Ordering::Less);
        assert_eq!(natural_cmp("Boxing", "acrobatics"), Ordering::Greater);
    }

    #[test]
    fn test_natural_ignores_punctuation() {
        assert_eq!(natural_cmp("Fast-Draw", "Fast Draw (Knife)"), Ordering::Less);
        assert_eq!(natural_cmp("(Lucky)", "Magery"), Ordering::Less);
    }

    #[test]
    fn test_flexible_numeric() {
        assert_eq!(flexible_cmp("5", "15"), Ordering::Less);
        assert_eq!(flexible_cmp("-2", "1.5"), Ordering::Less);
        assert_eq!(flexible_cmp("+3", "2"), Ordering::Greater);
    }

    #[test]
    fn test_container_marker_sorts_first() {
        let container = format!("{CONTAINER_MARKER}Zebra");
        assert_eq!(flexible_cmp(&container, "Apple"), Ordering::Less);
    }

    #[test]
    fn test_container_values_compare_numerically() {
        let high = format!("{CONTAINER_MARKER}1.5");
        let low = format!("{CONTAINER_MARKER}1.25");
        let negative = format!("{CONTAINER_MARKER}-2");
        assert_eq!(flexible_cmp(&low, &high), Ordering::Less);
        assert_eq!(flexible_cmp(&negative, &low), Ordering::Less);
    }

    #[test]
    fn test_descending_keeps_containers_first() {
        let container = format!("{CONTAINER_MARKER}1");
        assert_eq!(ordered_cmp(&container, "9", SortOrder::Descending), Ordering::Less);
        assert_eq!(ordered_cmp("9", "1", SortOrder::Descending), Ordering::Less);
        assert_eq!(
            ordered_cmp(&container, &format!("{CONTAINER_MARKER}5"), SortOrder::Descending),
            Ordering::Greater
        );
    }
}
