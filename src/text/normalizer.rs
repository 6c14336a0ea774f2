use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;
use unicode_normalization::UnicodeNormalization;

use super::dictionaries::{is_minor_word, lookup_acronym, lookup_exception, lookup_spelling};
use crate::TARGET_NORMALIZE;

lazy_static! {
    static ref INSTITUTION_PHRASE: Regex =
        Regex::new(r"(?i)\bINSTITUCI[OÓ]N\s+EDUCATIVA\b").expect("institution phrase regex");
    static ref SEDE_AFTER_DASH: Regex =
        Regex::new(r"\s+-\s+(Sede\s+[^-]+?)(?:\s*-\s*|$)").expect("dashed sede regex");
    static ref SEDE_TRAILING: Regex =
        Regex::new(r"\s+(Sede\s+[A-Za-z0-9\s]+?)(?:\s*-\s*|$)").expect("trailing sede regex");
}

const INSTITUTION_ABBREVIATION: &str = "I.E.";

/// Turns noisy open-data labels into display names.
///
/// Normalization is a pure function of the input and the static dictionaries in
/// [`super::dictionaries`]; the stages run in a fixed order and each one feeds the next.
#[derive(Clone, Copy, Debug, Default)]
pub struct TextNormalizer;

impl TextNormalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize(&self, raw: &str) -> String {
        if raw.is_empty() {
            return String::new();
        }

        // 1. Compose accents, collapse whitespace runs, trim.
        let collapsed = collapse_whitespace(&raw.nfc().collect::<String>());

        // 2. Whole-label exceptions short-circuit everything else.
        if let Some(fixed) = self.lookup_exception(&collapsed) {
            debug!(
                target: TARGET_NORMALIZE,
                "Normalized '{}' to '{}' using exceptions", collapsed, fixed
            );
            return fixed.to_string();
        }

        // 3. "Institución Educativa" becomes "I.E." before word casing.
        let substituted = INSTITUTION_PHRASE
            .replace_all(&collapsed, INSTITUTION_ABBREVIATION)
            .into_owned();

        // 4. A fully upper-case label would otherwise read as a row of acronyms.
        let prepared = if is_upper(&substituted) && substituted.chars().count() > 1 {
            substituted.to_lowercase()
        } else {
            substituted
        };

        // 5 + 6. Tokenize and case each word.
        let words: Vec<String> = prepared
            .split(' ')
            .filter(|word| !word.is_empty())
            .enumerate()
            .map(|(index, word)| case_word(word, index))
            .collect();

        // 7. "la" after an acronym reads as part of a proper name.
        let words = fix_article_after_acronym(words);

        // 8. Wrap a trailing "Sede ..." clause in parentheses.
        parenthesize_sede(&words.join(" "))
    }

    /// Checks the label as given, upper-cased, lower-cased and naively title-cased.
    fn lookup_exception(&self, label: &str) -> Option<&'static str> {
        lookup_exception(label)
            .or_else(|| lookup_exception(&label.to_uppercase()))
            .or_else(|| lookup_exception(&label.to_lowercase()))
            .or_else(|| {
                let title = label
                    .split(' ')
                    .map(naive_title)
                    .collect::<Vec<_>>()
                    .join(" ");
                lookup_exception(&title)
            })
    }
}

/// Cases a single word. Rules are tried in precedence order and the first match wins:
/// acronym dictionary, spelling dictionary, acronym heuristics, first-word
/// capitalization, minor words, plain capitalization.
fn case_word(word: &str, index: usize) -> String {
    let lower = word.to_lowercase();

    if let Some(acronym) = lookup_acronym(&lower) {
        return acronym.to_string();
    }

    if let Some(fixed) = lookup_spelling(&lower) {
        if index == 0 {
            return fixed.to_string();
        }
        let fixed_lower = fixed.to_lowercase();
        if is_minor_word(&fixed_lower) {
            return fixed_lower;
        }
        return fixed.to_string();
    }

    if looks_like_acronym(word, &lower) {
        return word.to_uppercase();
    }

    if index == 0 {
        return capitalize(word);
    }

    if is_minor_word(&lower) {
        return lower;
    }

    capitalize(word)
}

fn looks_like_acronym(word: &str, lower: &str) -> bool {
    if word.contains('.') {
        return true;
    }

    let len = word.chars().count();
    let upper = is_upper(word);
    let minor = is_minor_word(lower);

    if upper && (2..=6).contains(&len) && !minor {
        return true;
    }

    if len <= 6 && word.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()) {
        return true;
    }

    (2..=3).contains(&len) && (upper || is_title_case(word)) && !minor && lower != "y"
}

fn fix_article_after_acronym(words: Vec<String>) -> Vec<String> {
    let mut fixed: Vec<String> = Vec::with_capacity(words.len());
    for word in words {
        if !fixed.is_empty() && word.to_lowercase() == "la" {
            let previous = &fixed[fixed.len() - 1];
            if is_upper(previous) || previous == "CDI" {
                fixed.push("La".to_string());
            } else {
                fixed.push("la".to_string());
            }
        } else {
            fixed.push(word);
        }
    }
    fixed
}

fn parenthesize_sede(label: &str) -> String {
    let dashed = SEDE_AFTER_DASH.replace_all(label, " (${1})");
    let trailing = SEDE_TRAILING.replace_all(&dashed, " (${1})");
    collapse_whitespace(&trailing)
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_upper(text: &str) -> bool {
    text == text.to_uppercase()
}

fn is_title_case(word: &str) -> bool {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => {
            let rest = chars.as_str();
            !first.is_lowercase() && rest == rest.to_lowercase()
        }
        None => false,
    }
}

/// Upper-cases the first character whatever it is and lower-cases the rest.
fn naive_title(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.as_str().to_lowercase().chars())
            .collect(),
        None => String::new(),
    }
}

/// Upper-cases the first letter and lower-cases the rest; leading punctuation is kept.
fn capitalize(word: &str) -> String {
    let lower = word.to_lowercase();
    match lower.char_indices().find(|(_, c)| c.is_alphabetic()) {
        Some((idx, first)) => {
            let mut out = String::with_capacity(lower.len());
            out.push_str(&lower[..idx]);
            out.extend(first.to_uppercase());
            out.push_str(&lower[idx + first.len_utf8()..]);
            out
        }
        None => lower,
    }
}
