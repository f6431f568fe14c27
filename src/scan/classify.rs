// src/scan/classify.rs

use tracing::{debug, trace};

/// Substrings that mark a formula as an attempt to reach a shell, a binary or the network.
pub const DANGER_WORDS: &[&str] = &[
    "cmd",
    "powershell",
    "www",
    "http",
    "hyperlink",
    "shell",
    "bash",
    ".exe",
    ".sh",
    ".bat",
    "zsh",
    "dash",
    "ksh",
];

/// First danger word contained in `value`, ignoring case.
pub fn danger_word(value: &str) -> Option<&'static str> {
    let lowered = value.to_lowercase();
    DANGER_WORDS.iter().copied().find(|w| lowered.contains(w))
}

/// The flagged values carrying a danger word, in their original order.
pub fn detect_malicious<S: AsRef<str>>(flagged: &[S]) -> Vec<String> {
    let malicious: Vec<String> = flagged
        .iter()
        .map(|v| v.as_ref())
        .filter(|value| match danger_word(value) {
            Some(word) => {
                trace!(value = %value, word, "danger word");
                true
            }
            None => false,
        })
        .map(str::to_string)
        .collect();
    debug!(
        flagged = flagged.len(),
        malicious = malicious.len(),
        "classified formulae"
    );
    malicious
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_match_case_insensitively() {
        assert_eq!(danger_word("=CMD|' /C calc'!A0"), Some("cmd"));
        assert_eq!(danger_word("=HyperLink(\"x\")"), Some("hyperlink"));
        assert_eq!(danger_word("=SUM(A1:A3)"), None);
    }

    #[test]
    fn filter_preserves_order_and_duplicates() {
        let flagged = vec!["=1+1", "=cmd.exe", "-5", "=WWW.x", "=cmd.exe"];
        assert_eq!(
            detect_malicious(&flagged),
            vec!["=cmd.exe", "=WWW.x", "=cmd.exe"]
        );
    }

    #[test]
    fn output_is_a_subsequence_of_input() {
        let flagged: Vec<String> = vec!["=a".into(), "+powershell".into(), "/dash".into()];
        let malicious = detect_malicious(&flagged);
        let mut rest = flagged.iter();
        for m in &malicious {
            assert!(rest.any(|f| f == m));
        }
    }

    #[test]
    fn nothing_flagged_nothing_malicious() {
        let flagged: Vec<String> = Vec::new();
        assert!(detect_malicious(&flagged).is_empty());
    }
}
