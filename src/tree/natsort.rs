//! Natural, case-insensitive name ordering
//!
//! Names are split into maximal runs of ASCII digits and of everything else.
//! Digit runs compare by numeric value (of any length), other runs compare
//! case-insensitively, a digit run sorts before a text run at the same
//! position, and a name sorts before its own extensions. Names that compare
//! equal this way fall back to plain byte order so the result is total.

use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Num(&'a str),
    Text(&'a str),
}

struct Tokens<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        let first = self.rest.chars().next()?;
        let numeric = first.is_ascii_digit();
        let split = self
            .rest
            .find(|c: char| c.is_ascii_digit() != numeric)
            .unwrap_or(self.rest.len());
        let (run, rest) = self.rest.split_at(split);
        self.rest = rest;
        Some(if numeric { Token::Num(run) } else { Token::Text(run) })
    }
}

fn tokens(s: &str) -> Tokens<'_> {
    Tokens { rest: s }
}

fn cmp_numeric(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn cmp_text(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

fn cmp_token(a: Token<'_>, b: Token<'_>) -> Ordering {
    match (a, b) {
        (Token::Num(x), Token::Num(y)) => cmp_numeric(x, y),
        (Token::Text(x), Token::Text(y)) => cmp_text(x, y),
        (Token::Num(_), Token::Text(_)) => Ordering::Less,
        (Token::Text(_), Token::Num(_)) => Ordering::Greater,
    }
}

/// Compare two names in natural case-insensitive order
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = tokens(a);
    let mut right = tokens(b);
    loop {
        match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => match cmp_token(x, y) {
                Ordering::Equal => {}
                other => return other,
            },
        }
    }
}

/// Sort `items` naturally by the name `key` extracts
pub fn sort_natural<T, F>(items: &mut [T], key: F)
where
    F: Fn(&T) -> &str,
{
    items.sort_by(|a, b| natural_cmp(key(a), key(b)));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(names: &[&str]) -> Vec<String> {
        let mut v: Vec<String> = names.iter().map(ToString::to_string).collect();
        sort_natural(&mut v, String::as_str);
        v
    }

    #[test]
    fn test_tokenize() {
        let t: Vec<Token<'_>> = tokens("track10b.mp3").collect();
        assert_eq!(
            t,
            vec![
                Token::Text("track"),
                Token::Num("10"),
                Token::Text("b.mp"),
                Token::Num("3"),
            ]
        );
        assert_eq!(tokens("").count(), 0);
    }

    #[test]
    fn test_numeric_runs() {
        assert_eq!(
            sorted(&["track10.mp3", "track2.mp3", "Track1.mp3"]),
            vec!["Track1.mp3", "track2.mp3", "track10.mp3"]
        );
        assert_eq!(sorted(&["10", "9", "100", "09"]), vec!["09", "9", "10", "100"]);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(sorted(&["b", "A", "a", "B"]), vec!["A", "a", "B", "b"]);
        assert_eq!(natural_cmp("Zebra", "apple"), Ordering::Greater);
    }

    #[test]
    fn test_prefix_first_and_numbers_before_text() {
        assert_eq!(sorted(&["abc", "ab"]), vec!["ab", "abc"]);
        assert_eq!(sorted(&["a", "1"]), vec!["1", "a"]);
        assert_eq!(sorted(&["disc 2", "disc 10", "disc"]), vec!["disc", "disc 2", "disc 10"]);
    }

    #[test]
    fn test_huge_numbers() {
        assert_eq!(
            natural_cmp("x99999999999999999999999", "x100000000000000000000000"),
            Ordering::Less
        );
    }

    #[test]
    fn test_stable_total_order() {
        assert_eq!(natural_cmp("same", "same"), Ordering::Equal);
        assert_ne!(natural_cmp("a1", "a01"), Ordering::Equal);
    }
}
