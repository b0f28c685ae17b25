/// Ordinal and positional references ("el segundo", "the last one", "archivo 3")

use regex::Regex;
use std::sync::OnceLock;

/// Regex alternation matching every ordinal word `parse_ordinal` knows.
pub const ORDINAL_WORDS_PATTERN: &str = "primer[oa]?|segund[oa]?|tercer[oa]?|cuart[oa]?|quint[oa]?\
|sext[oa]?|s[ée]ptim[oa]?|octav[oa]?|noven[oa]?|d[ée]cim[oa]?|[úu]ltim[oa]?\
|first|second|third|fourth|fifth|sixth|seventh|eighth|ninth|tenth|last";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ordinal {
    /// 1-based position.
    Position(usize),
    Last,
}

impl Ordinal {
    pub fn pick<'a, T>(&self, items: &'a [T]) -> Option<&'a T> {
        match *self {
            Ordinal::Position(n) if n >= 1 => items.get(n - 1),
            Ordinal::Position(_) => None,
            Ordinal::Last => items.last(),
        }
    }
}

// Spanish stems take an optional gender/number suffix.
const SPANISH_STEMS: &[(&str, Ordinal)] = &[
    ("primer", Ordinal::Position(1)),
    ("segund", Ordinal::Position(2)),
    ("tercer", Ordinal::Position(3)),
    ("cuart", Ordinal::Position(4)),
    ("quint", Ordinal::Position(5)),
    ("sext", Ordinal::Position(6)),
    ("séptim", Ordinal::Position(7)),
    ("septim", Ordinal::Position(7)),
    ("octav", Ordinal::Position(8)),
    ("noven", Ordinal::Position(9)),
    ("décim", Ordinal::Position(10)),
    ("decim", Ordinal::Position(10)),
    ("últim", Ordinal::Last),
    ("ultim", Ordinal::Last),
];

const ENGLISH_WORDS: &[(&str, Ordinal)] = &[
    ("first", Ordinal::Position(1)),
    ("second", Ordinal::Position(2)),
    ("third", Ordinal::Position(3)),
    ("fourth", Ordinal::Position(4)),
    ("fifth", Ordinal::Position(5)),
    ("sixth", Ordinal::Position(6)),
    ("seventh", Ordinal::Position(7)),
    ("eighth", Ordinal::Position(8)),
    ("ninth", Ordinal::Position(9)),
    ("tenth", Ordinal::Position(10)),
    ("last", Ordinal::Last),
];

const SPANISH_SUFFIXES: &[&str] = &["", "o", "a", "os", "as"];

static NUMBER_REGEX: OnceLock<Regex> = OnceLock::new();

fn number_regex() -> &'static Regex {
    NUMBER_REGEX.get_or_init(|| Regex::new(r"\d+").expect("number pattern is valid"))
}

fn word_ordinal(token: &str) -> Option<Ordinal> {
    if let Some((_, ordinal)) = ENGLISH_WORDS.iter().find(|(word, _)| *word == token) {
        return Some(*ordinal);
    }
    SPANISH_STEMS.iter().find_map(|(stem, ordinal)| {
        let rest = token.strip_prefix(stem)?;
        SPANISH_SUFFIXES.contains(&rest).then_some(*ordinal)
    })
}

/// Parse the first ordinal word in `reference`, falling back to the first
/// embedded integer. Anything else is not a reference.
pub fn parse_ordinal(reference: &str) -> Option<Ordinal> {
    let lower = reference.to_lowercase();

    let by_word = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .find_map(word_ordinal);
    if by_word.is_some() {
        return by_word;
    }

    let digits = number_regex().find(&lower)?;
    digits.as_str().parse::<usize>().ok().map(Ordinal::Position)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spanish_words() {
        assert_eq!(parse_ordinal("el primero"), Some(Ordinal::Position(1)));
        assert_eq!(parse_ordinal("la primera"), Some(Ordinal::Position(1)));
        assert_eq!(parse_ordinal("el primer archivo"), Some(Ordinal::Position(1)));
        assert_eq!(parse_ordinal("el segundo"), Some(Ordinal::Position(2)));
        assert_eq!(parse_ordinal("la Tercera"), Some(Ordinal::Position(3)));
        assert_eq!(parse_ordinal("el décimo"), Some(Ordinal::Position(10)));
        assert_eq!(parse_ordinal("el ÚLTIMO"), Some(Ordinal::Last));
        assert_eq!(parse_ordinal("la ultima"), Some(Ordinal::Last));
    }

    #[test]
    fn test_english_words() {
        assert_eq!(parse_ordinal("the fourth one"), Some(Ordinal::Position(4)));
        assert_eq!(parse_ordinal("the last one"), Some(Ordinal::Last));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(parse_ordinal("archivo 3"), Some(Ordinal::Position(3)));
        assert_eq!(parse_ordinal("item 12"), Some(Ordinal::Position(12)));
        assert_eq!(parse_ordinal("2º"), Some(Ordinal::Position(2)));
    }

    #[test]
    fn test_words_win_over_numbers() {
        assert_eq!(parse_ordinal("el último de 3"), Some(Ordinal::Last));
    }

    #[test]
    fn test_stem_needs_known_suffix() {
        assert_eq!(parse_ordinal("primavera"), None);
        assert_eq!(parse_ordinal("quintal"), None);
        assert_eq!(parse_ordinal("lastly"), None);
    }

    #[test]
    fn test_not_a_reference() {
        assert_eq!(parse_ordinal("abre el informe"), None);
        assert_eq!(parse_ordinal(""), None);
    }

    #[test]
    fn test_pick() {
        let items = ["a", "b", "c"];
        assert_eq!(Ordinal::Position(1).pick(&items), Some(&"a"));
        assert_eq!(Ordinal::Last.pick(&items), Some(&"c"));
        assert_eq!(Ordinal::Position(4).pick(&items), None);
        assert_eq!(Ordinal::Position(0).pick(&items), None);
        assert_eq!(Ordinal::Last.pick::<&str>(&[]), None);
    }

    #[test]
    fn test_pattern_compiles_and_covers_words() {
        let re = Regex::new(&format!("^(?:{})$", ORDINAL_WORDS_PATTERN)).unwrap();
        for word in ["primero", "séptima", "decimo", "último", "tenth", "last"] {
            assert!(re.is_match(word), "{} should match", word);
        }
    }
}
