//! Condenses long explanatory text (usually a full agent reply) into a
//! short appointment reason.
//!
//! Every output is shorter than [`SHORT_REASON_CHARS`], and input already
//! under that length is returned as-is (trimmed), so applying
//! [`sanitize`] twice gives the same result as applying it once.

/// Inputs shorter than this (in characters, after trimming) pass through.
pub const SHORT_REASON_CHARS: usize = 60;

/// Hard ceiling on any reason this module produces.
pub const MAX_REASON_CHARS: usize = 100;

/// Longest hint kept verbatim in the `"<hint> evaluation"` template.
const MAX_HINT_CHARS: usize = 45;

const GENERAL_CONSULTATION: &str = "General consultation";

/// Common concerns recognized when no condition hint is available.
const KNOWN_CONDITIONS: &[(&str, &str)] = &[
    ("chest pain", "Chest pain consultation"),
    ("headache", "Headache evaluation"),
    ("stomach cramp", "Stomach cramps and digestive issues"),
    ("abdominal pain", "Abdominal pain evaluation"),
    ("fever", "Fever and related symptoms"),
    ("cough", "Persistent cough evaluation"),
    ("shortness of breath", "Breathing difficulty assessment"),
    ("dizziness", "Dizziness and balance issues"),
    ("fatigue", "Chronic fatigue evaluation"),
    ("medication", "Medication review and concerns"),
    ("blood pressure", "Blood pressure management"),
    ("diabetes", "Diabetes management"),
    ("anxiety", "Anxiety and mental health consultation"),
    ("depression", "Depression evaluation"),
    ("back pain", "Back pain assessment"),
    ("joint pain", "Joint pain evaluation"),
    ("skin rash", "Skin condition evaluation"),
    ("allergy", "Allergy assessment"),
    ("asthma", "Asthma management"),
];

/// Produce a short, appointment-appropriate reason from `text`.
///
/// `hint` is the condition the appointment is about (e.g. `"headache"`).
/// Never fails: empty input yields `"General consultation"`.
pub fn sanitize(text: &str, hint: Option<&str>) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return GENERAL_CONSULTATION.to_string();
    }
    if char_len(trimmed) < SHORT_REASON_CHARS {
        return trimmed.to_string();
    }

    let hint = hint.map(str::trim).filter(|h| !h.is_empty());
    let reason = match hint {
        Some(hint) => clause_containing(trimmed, hint).unwrap_or_else(|| evaluation_of(hint)),
        None => known_condition(trimmed).unwrap_or_else(|| {
            truncate_at_word_boundary(trimmed, SHORT_REASON_CHARS - 1)
        }),
    };

    if reason.is_empty() {
        GENERAL_CONSULTATION.to_string()
    } else {
        reason
    }
}

/// Shortest-fitting sentence or clause that mentions `hint`. Exact-case
/// mentions win over case-insensitive ones.
fn clause_containing(text: &str, hint: &str) -> Option<String> {
    let candidates: Vec<&str> = text
        .split(['.', '!', '?', ';', '\n'])
        .flat_map(|sentence| {
            let sentence = sentence.trim();
            if char_len(sentence) < SHORT_REASON_CHARS {
                vec![sentence]
            } else {
                sentence.split([',', ':']).map(str::trim).collect()
            }
        })
        .filter(|c| !c.is_empty() && char_len(c) < SHORT_REASON_CHARS)
        .collect();

    let hint_lower = hint.to_lowercase();
    candidates
        .iter()
        .find(|c| c.contains(hint))
        .or_else(|| {
            candidates
                .iter()
                .find(|c| c.to_lowercase().contains(&hint_lower))
        })
        .map(|c| c.to_string())
}

fn evaluation_of(hint: &str) -> String {
    let hint = truncate_at_word_boundary(hint, MAX_HINT_CHARS);
    format!("{hint} evaluation")
}

fn known_condition(text: &str) -> Option<String> {
    let lowered = text.to_lowercase();
    if let Some((_, reason)) = KNOWN_CONDITIONS
        .iter()
        .find(|(needle, _)| lowered.contains(needle))
    {
        return Some(reason.to_string());
    }
    if lowered.contains("follow") && lowered.contains("up") {
        return Some("Follow-up consultation".to_string());
    }
    None
}

/// Cut to at most `max` characters, backing off to the last whitespace.
/// No ellipsis is appended.
fn truncate_at_word_boundary(text: &str, max: usize) -> String {
    let text = text.trim();
    let end = match text.char_indices().nth(max) {
        Some((byte, _)) => byte,
        None => return text.to_string(),
    };
    let truncated = &text[..end];
    let cut = match truncated.rfind(char::is_whitespace) {
        Some(pos) if pos > 0 => &truncated[..pos],
        _ => truncated,
    };
    cut.trim_end_matches(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | ':' | '-'))
        .to_string()
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADACHE_REPLY: &str = "I'm really sorry you're going through this. Persistent \
        headaches can be exhausting and it makes sense that you want answers. Common \
        causes include tension, dehydration, eye strain, poor sleep and sometimes \
        medication overuse, but only a clinician can properly evaluate what is behind \
        yours. Because the pain has lasted several days, I recommend you book an \
        appointment with a Neurologist so they can examine you. In the meantime, keep \
        a simple diary of when the pain starts.";

    // =================================================================
    // PASS-THROUGH
    // =================================================================

    #[test]
    fn empty_input_gives_general_consultation() {
        assert_eq!(sanitize("", None), "General consultation");
        assert_eq!(sanitize("   \n ", Some("headache")), "General consultation");
    }

    #[test]
    fn short_input_returned_unchanged() {
        assert_eq!(sanitize("Follow-up on blood test", None), "Follow-up on blood test");
        assert_eq!(sanitize("  Knee check  ", Some("knee")), "Knee check");
    }

    // =================================================================
    // CONDENSING
    // =================================================================

    #[test]
    fn long_headache_reply_condensed_around_hint() {
        assert!(HEADACHE_REPLY.chars().count() > 400);
        let reason = sanitize(HEADACHE_REPLY, Some("headache"));
        assert!(reason.chars().count() < MAX_REASON_CHARS, "too long: {reason}");
        assert!(reason.to_lowercase().contains("headache"), "got {reason}");
    }

    #[test]
    fn hint_without_matching_clause_uses_template() {
        let text = "a".repeat(30) + " " + &"b".repeat(70);
        assert_eq!(sanitize(&text, Some("back pain")), "back pain evaluation");
    }

    #[test]
    fn long_hint_is_capped_in_template() {
        let text = "x ".repeat(80);
        let hint = "very ".repeat(20) + "long condition";
        let reason = sanitize(&text, Some(&hint));
        assert!(reason.ends_with(" evaluation"));
        assert!(reason.chars().count() < SHORT_REASON_CHARS);
    }

    #[test]
    fn known_condition_used_without_hint() {
        let text = "You mentioned stomach cramps after meals. ".repeat(3);
        assert_eq!(sanitize(&text, None), "Stomach cramps and digestive issues");
    }

    #[test]
    fn follow_up_recognized_without_hint() {
        let text = "The patient would like to follow up on the results from last month and \
                    discuss next steps with the team.";
        assert_eq!(sanitize(text, None), "Follow-up consultation");
    }

    #[test]
    fn no_hint_truncates_at_word_boundary_without_ellipsis() {
        let text = "Requesting a general review of recent lab results and overall wellbeing \
                    before travelling abroad next month";
        let reason = sanitize(text, None);
        assert!(reason.chars().count() < SHORT_REASON_CHARS);
        assert!(text.starts_with(&reason));
        assert!(!reason.ends_with("..."));
        assert!(!reason.ends_with(' '));
    }

    #[test]
    fn unbroken_text_is_hard_cut() {
        let text = "z".repeat(300);
        assert_eq!(sanitize(&text, None).chars().count(), SHORT_REASON_CHARS - 1);
    }

    // =================================================================
    // PROPERTIES
    // =================================================================

    #[test]
    fn idempotent_and_bounded() {
        let long_clause = "word ".repeat(40);
        let inputs: Vec<(String, Option<&str>)> = vec![
            (String::new(), None),
            ("Short reason".into(), None),
            (HEADACHE_REPLY.into(), Some("headache")),
            (HEADACHE_REPLY.into(), None),
            (HEADACHE_REPLY.into(), Some("migraine")),
            (long_clause.clone(), Some("word")),
            (long_clause, None),
            ("日本語のテキスト".repeat(20), None),
            ("Ünïcödé ".repeat(20), Some("ünïcödé")),
        ];
        for (input, hint) in inputs {
            let once = sanitize(&input, hint);
            let twice = sanitize(&once, hint);
            assert_eq!(once, twice, "not idempotent for {input:?}");
            assert!(once.chars().count() < MAX_REASON_CHARS);
            assert!(!once.is_empty());
        }
    }
}
