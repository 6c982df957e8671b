//! Narration cleanup: turn raw extracted page text into a speakable script.
//!
//! PDF text extraction on scanned or oddly typeset pages produces text with
//! hard line breaks, stray spaces inside words (`"M y M am a"`) and a page
//! number glued to the end. None of that should be read aloud.
//!
//! ## Rule Order
//!
//! Rules run in a fixed order and each is a pure `&str → String` pass:
//!
//! 1. Line breaks become spaces
//! 2. A single whitespace between two ASCII letters is removed
//! 3. Whitespace runs collapse to one space; ends are trimmed
//! 4. One trailing page-number marker (`12`, `Page 7`, `pg. 3`, `p 9`) is stripped
//!
//! Rule 2 must see the spaces produced by rule 1, and rule 4 relies on rule 3
//! having normalised the trailing whitespace.

use once_cell::sync::Lazy;
use regex::Regex;

/// Clean one page of extracted text for speech synthesis.
///
/// Total and side-effect free: empty input gives empty output. Not
/// idempotent: a whitespace run between two words collapses to a single
/// space, which a second call then removes (`"The  cat sat"` → `"The catsat"`
/// → `"Thecatsat"`). Text without such runs and with at most one trailing
/// number is stable.
pub fn normalize_narration(raw: &str) -> String {
    let s = join_lines(raw);
    let s = join_split_words(&s);
    let s = collapse_whitespace(&s);
    strip_page_number(&s)
}

// ── Rule 1: Line breaks ──────────────────────────────────────────────────────

fn join_lines(input: &str) -> String {
    input.replace('\n', " ")
}

// ── Rule 2: Stray spaces inside words ────────────────────────────────────────
//
// Equivalent to applying `([a-zA-Z])\s([a-zA-Z])` → `$1$2` until the string
// stops changing. Dropping a whitespace character never changes which
// characters neighbour any *other* whitespace character, so the fixed point
// is reached in one linear scan that decides each whitespace character from
// its original neighbours.

fn join_split_words(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());

    for (i, &c) in chars.iter().enumerate() {
        if c.is_whitespace() && i > 0 && i + 1 < chars.len() {
            let before = chars[i - 1];
            let after = chars[i + 1];
            if before.is_ascii_alphabetic() && after.is_ascii_alphabetic() {
                continue;
            }
        }
        out.push(c);
    }

    out
}

// ── Rule 3: Whitespace runs ──────────────────────────────────────────────────

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ── Rule 4: Trailing page number ─────────────────────────────────────────────
//
// Applied once. `"Chapter 2 14"` loses only the `14`.

static RE_PAGE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:Page|Pg\.?|P\.?)?\s*\d+\s*$").unwrap());

fn strip_page_number(input: &str) -> String {
    RE_PAGE_NUMBER.replace(input, "").trim().to_string()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// The repeated-substitution formulation, used as a reference.
    fn join_split_words_fixed_point(input: &str) -> String {
        let re = Regex::new(r"([a-zA-Z])\s([a-zA-Z])").unwrap();
        let mut current = input.to_string();
        loop {
            let next = re.replace_all(&current, "$1$2").to_string();
            if next == current {
                return current;
            }
            current = next;
        }
    }

    #[test]
    fn test_join_lines() {
        assert_eq!(join_lines("a\nb\n"), "a b ");
    }

    #[test]
    fn test_split_words_merge() {
        assert_eq!(join_split_words("M y M am a"), "MyMama");
    }

    #[test]
    fn test_split_words_needs_single_space() {
        assert_eq!(join_split_words("a  b"), "a  b");
        assert_eq!(join_split_words("ab, cd"), "ab, cd");
    }

    #[test]
    fn test_split_words_matches_fixed_point() {
        let samples = [
            "M y M am a is M y H er o",
            "a b c d e",
            "T he  cat, s at.\tO n 4 m ats",
            "x\ty z  w",
            "Héllo w orld",
            "",
            " a",
        ];
        for s in samples {
            assert_eq!(
                join_split_words(s),
                join_split_words_fixed_point(s),
                "input: {s:?}"
            );
        }
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \t b   c  "), "a b c");
    }

    #[test]
    fn test_strip_page_number_variants() {
        assert_eq!(strip_page_number("The end. 42"), "The end.");
        assert_eq!(strip_page_number("The end. Page 7"), "The end.");
        assert_eq!(strip_page_number("The end. pg. 3"), "The end.");
        assert_eq!(strip_page_number("The end. P9"), "The end.");
        assert_eq!(strip_page_number("12"), "");
    }

    #[test]
    fn test_strip_page_number_takes_leftmost_prefix() {
        // The optional `P` prefix also matches a word's last letter.
        assert_eq!(strip_page_number("Help 3"), "Hel");
    }

    #[test]
    fn test_strip_page_number_once() {
        assert_eq!(strip_page_number("Chapter, 2 14"), "Chapter, 2");
    }

    #[test]
    fn test_newlines_then_collapse() {
        // Multi-character tokens are never joined.
        assert_eq!(normalize_narration("ab\n\ncd   ef"), "ab cd ef");
        assert_eq!(normalize_narration("a\n\nb   c"), "a b c");
    }

    #[test]
    fn test_full_pipeline_on_damaged_page() {
        let raw = "M y M am a\nis M y H er o!\n\n 3 ";
        assert_eq!(normalize_narration(raw), "MyMamaisMyHero!");
    }

    #[test]
    fn test_page_number_only() {
        assert_eq!(normalize_narration("  12\n"), "");
        assert_eq!(normalize_narration("Page 7"), "");
    }

    #[test]
    fn test_empty() {
        assert_eq!(normalize_narration(""), "");
        assert_eq!(normalize_narration(" \n\t "), "");
    }

    #[test]
    fn test_clean_text_unchanged() {
        let clean = "Hello, world! 1, 2, 3... go.";
        assert_eq!(normalize_narration(clean), clean);
    }

    #[test]
    fn test_two_trailing_numbers_need_two_calls() {
        // Stripping is single-pass, so a second call removes the next group.
        assert_eq!(normalize_narration("x 1 2"), "x 1");
        assert_eq!(normalize_narration("x 1"), "x");
    }

    #[test]
    fn test_collapsed_run_is_joined_by_second_call() {
        assert_eq!(normalize_narration("ab  cd"), "ab cd");
        assert_eq!(normalize_narration("ab cd"), "abcd");
    }

    #[test]
    fn test_not_idempotent_after_whitespace_run() {
        // Collapsing runs after joining leaves a letter-space-letter triple.
        let once = normalize_narration("The  cat sat");
        assert_eq!(once, "The catsat");
        let twice = normalize_narration(&once);
        assert_eq!(twice, "Thecatsat");
        assert_ne!(once, twice);
    }

    #[test]
    fn test_stable_on_damaged_pages() {
        let samples = [
            "M y M am a\nis M y H er o 3",
            "She said: \"Yes\" -- and left. Pg. 12",
            "Once upon a time, 99 red balloons 2",
        ];
        for s in samples {
            let once = normalize_narration(s);
            assert_eq!(normalize_narration(&once), once, "input: {s:?}");
        }
    }
}
