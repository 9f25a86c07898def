//! Directive/advice language detection for generated stage output
//!
//! Every stage prompt forbids investment advice, and every stage prompt also
//! instructs the generator to disclaim ("we do not provide investment
//! advice"). A naive keyword scan flags those disclaimers, so each match is
//! checked against a small window of surrounding text for negation markers
//! before it counts as a violation.

use lazy_static::lazy_static;
use regex::Regex;

/// Characters inspected on each side of a match when looking for negation.
const NEGATION_WINDOW: usize = 12;

lazy_static! {
    /// Strong directive patterns: imperative trade actions, target-price /
    /// stop-loss mentions, profit or loss forecasts.
    static ref STRONG_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(매수|매도|투자)\s*(하세요|해라|하십시오|하는\s*것이\s*좋)"),
        Regex::new(r"(사세요|파세요|사라|팔아라)"),
        Regex::new(r"(목표가|손절|익절)"),
        Regex::new(r"(수익|손실)\s*(전망|예측)"),
        Regex::new(r"(?i)\b(buy|sell)\s+(now|immediately|today)\b"),
        Regex::new(r"(?i)\b(target\s+price|stop[- ]loss|take[- ]profit)\b"),
    ]
    .into_iter()
    .map(|r| r.expect("Failed to compile STRONG_PATTERNS regex - this is a bug in the hardcoded pattern"))
    .collect();

    /// Soft advice-noun patterns: generic words for advice/recommendation.
    static ref SOFT_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"조언"),
        Regex::new(r"추천"),
        Regex::new(r"(?i)\badvice\b"),
        Regex::new(r"(?i)\brecommend(ation)?s?\b"),
    ]
    .into_iter()
    .map(|r| r.expect("Failed to compile SOFT_PATTERNS regex - this is a bug in the hardcoded pattern"))
    .collect();
}

/// Negation markers that suppress a match when found in its window.
const NEGATION_MARKERS: &[&str] = &[
    "않",
    "없",
    "아니",
    "금지",
    "마세요",
    "말 것",
    "해당 없음",
    "not",
    "n't",
    "never",
    "no ",
    "without",
];

/// Returns true when the text contains unsuppressed directive/advice
/// language. A single unsuppressed match anywhere flags the whole text.
pub fn contains_directive_advice(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }

    let chars: Vec<char> = text.chars().collect();

    STRONG_PATTERNS
        .iter()
        .chain(SOFT_PATTERNS.iter())
        .any(|pattern| has_unsuppressed_match(pattern, text, &chars))
}

fn has_unsuppressed_match(pattern: &Regex, text: &str, chars: &[char]) -> bool {
    for m in pattern.find_iter(text) {
        if !is_negated(text, chars, m.start(), m.end()) {
            return true;
        }
    }
    false
}

/// Check a fixed-width character window around the match for negation
/// markers. A negated match is the stage correctly disclaiming, not
/// violating.
fn is_negated(text: &str, chars: &[char], byte_start: usize, byte_end: usize) -> bool {
    let char_start = text[..byte_start].chars().count();
    let char_end = char_start + text[byte_start..byte_end].chars().count();

    let window_start = char_start.saturating_sub(NEGATION_WINDOW);
    let window_end = (char_end + NEGATION_WINDOW).min(chars.len());
    let window: String = chars[window_start..window_end].iter().collect();
    let window_lower = window.to_lowercase();

    NEGATION_MARKERS
        .iter()
        .any(|marker| window_lower.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_imperative_violates() {
        assert!(contains_directive_advice("매수하세요"));
        assert!(contains_directive_advice("지금이라도 사세요, 기회입니다"));
    }

    #[test]
    fn test_negated_advice_term_is_suppressed() {
        assert!(!contains_directive_advice("투자 조언을 하지 않습니다"));
        assert!(!contains_directive_advice(
            "본 분석은 매수/매도 추천이 아니며 참고용입니다. 추천 없음."
        ));
    }

    #[test]
    fn test_english_disclaimer_is_suppressed() {
        assert!(!contains_directive_advice(
            "Investment advice: not applicable."
        ));
        assert!(!contains_directive_advice("We do not recommend any action."));
    }

    #[test]
    fn test_english_directive_violates() {
        assert!(contains_directive_advice("You should buy now before earnings."));
        assert!(contains_directive_advice("Set a stop-loss at $180."));
    }

    #[test]
    fn test_target_price_violates() {
        assert!(contains_directive_advice("목표가 250달러를 제시합니다"));
    }

    #[test]
    fn test_one_unsuppressed_match_flags_whole_text() {
        let text = "면책: 투자 조언을 하지 않습니다. 다만 이 종목은 매수하세요.";
        assert!(contains_directive_advice(text));
    }

    #[test]
    fn test_neutral_analysis_passes() {
        let text = "주가는 실적 발표 후 하락 추세로 전환되었고 변동성이 확대되었습니다.";
        assert!(!contains_directive_advice(text));
        assert!(!contains_directive_advice(""));
    }
}
