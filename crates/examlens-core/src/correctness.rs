//! Answer correctness resolution.
//!
//! This is the single place that decides whether an option is the correct
//! one. Highlighting in the solutions view and the outcome counts in the
//! analysis both go through [`is_correct`], so they cannot disagree.

use crate::question::{CorrectAnswer, OptionKey, Question};

/// Decide whether `option_key` names the correct answer of `question`.
///
/// The key is normalized to a letter first (`"b"`, `"B."`, `"option_b"`,
/// or a 0-based index). Unknown keys are never correct.
pub fn is_correct(question: &Question, option_key: &str) -> bool {
    option_key
        .parse::<OptionKey>()
        .is_ok_and(|key| is_correct_key(question, key))
}

/// [`is_correct`] for an already-parsed key.
pub fn is_correct_key(question: &Question, key: OptionKey) -> bool {
    correct_key(question) == Some(key)
}

/// The one option key the question's correct answer resolves to.
///
/// A letter code resolves directly. A text answer is matched against the
/// options in A..D order, first by exact text, then trimmed and
/// case-insensitively, then against the display text (which substitutes the
/// placeholder for an empty option). The first matching option wins, so at
/// most one key is ever correct.
pub fn correct_key(question: &Question) -> Option<OptionKey> {
    match question.correct_answer()? {
        CorrectAnswer::Letter(key) => Some(key),
        CorrectAnswer::Text(expected) => OptionKey::ALL
            .into_iter()
            .find(|key| text_matches(question, *key, &expected)),
    }
}

fn text_matches(question: &Question, key: OptionKey, expected: &str) -> bool {
    match question.option_text(key) {
        Some(text) => text == expected || loosely_equal(text, expected),
        // An empty option is only ever compared against the placeholder.
        None => loosely_equal(question.display_text(key), expected),
    }
}

fn loosely_equal(a: &str, b: &str) -> bool {
    let (a, b) = (a.trim(), b.trim());
    a == b || a.to_lowercase() == b.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::EMPTY_OPTION_PLACEHOLDER;

    fn capitals() -> Question {
        Question::new("q1").with_options(["Paris", "London", "Rome", "Berlin"])
    }

    fn verdicts(q: &Question) -> Vec<bool> {
        ["A", "B", "C", "D"].iter().map(|k| is_correct(q, k)).collect()
    }

    #[test]
    fn letter_text_and_punctuated_encodings_agree() {
        for encoding in ["B", "b", "B.", " b. ", "London", " london ", "LONDON"] {
            let q = capitals().with_correct_option(encoding);
            assert_eq!(
                verdicts(&q),
                vec![false, true, false, false],
                "encoding {encoding:?}"
            );
        }
    }

    #[test]
    fn exactly_one_key_for_every_letter() {
        for letter in ["A", "B", "C", "D"] {
            let q = capitals().with_correct_option(letter);
            assert_eq!(verdicts(&q).iter().filter(|v| **v).count(), 1);
            assert!(is_correct(&q, letter));
        }
    }

    #[test]
    fn letter_answer_ignores_options_whose_text_is_a_letter() {
        let q = Question::new("q2")
            .with_options(["B", "A", "D", "C"])
            .with_correct_option("B");
        assert_eq!(verdicts(&q), vec![false, true, false, false]);
    }

    #[test]
    fn option_keys_normalize() {
        let q = capitals().with_correct_option("C");
        assert!(is_correct(&q, "c"));
        assert!(is_correct(&q, "option_c"));
        assert!(is_correct(&q, "2"));
        assert!(!is_correct(&q, "E"));
        assert!(!is_correct(&q, ""));
    }

    #[test]
    fn missing_or_empty_correct_option_is_never_correct() {
        let q = capitals();
        assert_eq!(verdicts(&q), vec![false; 4]);
        let q = capitals().with_correct_option("   ");
        assert_eq!(verdicts(&q), vec![false; 4]);
    }

    #[test]
    fn empty_option_matches_only_placeholder() {
        let q = Question::new("q3")
            .with_options(["Paris", "", "Rome", "Berlin"])
            .with_correct_option("");
        assert_eq!(verdicts(&q), vec![false; 4]);

        let q = Question::new("q3")
            .with_options(["Paris", "", "Rome", "Berlin"])
            .with_correct_option(EMPTY_OPTION_PLACEHOLDER);
        assert_eq!(verdicts(&q), vec![false, true, false, false]);
    }

    #[test]
    fn duplicate_option_texts_resolve_to_first() {
        let q = Question::new("q4")
            .with_options(["Same", "Same", "Other", "Else"])
            .with_correct_option("Same");
        assert_eq!(correct_key(&q), Some(OptionKey::A));
        assert_eq!(verdicts(&q), vec![true, false, false, false]);
    }

    #[test]
    fn unmatched_text_yields_no_key() {
        let q = capitals().with_correct_option("Madrid");
        assert_eq!(correct_key(&q), None);
        assert_eq!(verdicts(&q), vec![false; 4]);
    }
}
