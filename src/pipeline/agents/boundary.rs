use std::sync::LazyLock;

use regex::Regex;

/// Reply substituted for a generated answer that tells the user to change
/// a dose.
pub const SAFE_DEFERRAL: &str = "I can't advise changing how much of a medication you take. \
Dose changes should only be made by your prescriber, so please contact your doctor or pharmacist \
before changing anything. I recommend you book an appointment with them to discuss it.";

/// A compiled dosage-alteration pattern.
struct DosePattern {
    regex: Regex,
    description: &'static str,
}

/// A directive found in a generated reply.
#[derive(Debug, Clone, PartialEq)]
pub struct DoseDirective {
    pub matched_text: String,
    pub description: &'static str,
}

static DOSE_PATTERNS: LazyLock<Vec<DosePattern>> = LazyLock::new(|| {
    vec![
        pattern(
            r"(?i)\b(?:increase|decrease|double|triple|halve|raise|lower|reduce|skip|stop|cut)\s+(?:your|the|this)\s+(?:daily\s+)?(?:dose|doses|dosage|medication|medicine|pills?|tablets?|insulin)\b",
            "Dose change directive: 'increase/skip your dose'",
        ),
        pattern(
            r"(?i)\btake\s+(?:\d+|an?|one|two|three)\s+(?:extra|more|additional)\s+(?:doses?|pills?|tablets?|capsules?|puffs?)\b",
            "Extra dose directive: 'take 2 extra tablets'",
        ),
        pattern(
            r"(?i)\b(?:increase|raise|up|bump|lower|reduce)\s+(?:it|the\s+dose|your\s+dose)\s+to\s+\d+(?:\.\d+)?\s*(?:mg|mcg|g|ml|units?)\b",
            "Dose target directive: 'increase the dose to 400 mg'",
        ),
        pattern(
            r"(?i)\bdouble\s+up\b",
            "Double-up directive",
        ),
    ]
});

/// Words right before a match that turn it into a warning ("do not skip
/// your dose") rather than a directive.
static NEGATED_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:not|never|don'?t|avoid|without|before|whether\s+to|if\s+you)\s+(?:\w+\s+){0,2}$")
        .expect("Invalid negation regex pattern")
});

fn pattern(regex_str: &str, description: &'static str) -> DosePattern {
    DosePattern {
        regex: Regex::new(regex_str).expect("Invalid dose regex pattern"),
        description,
    }
}

/// First dosage-alteration directive in `text`, ignoring negated mentions.
pub fn find_dose_directive(text: &str) -> Option<DoseDirective> {
    for dp in DOSE_PATTERNS.iter() {
        for mat in dp.regex.find_iter(text) {
            if is_negated(&text[..mat.start()]) {
                continue;
            }
            return Some(DoseDirective {
                matched_text: mat.as_str().to_string(),
                description: dp.description,
            });
        }
    }
    None
}

fn is_negated(prefix: &str) -> bool {
    // Only the tail of the sentence matters.
    let tail_start = prefix
        .rfind(['.', '!', '?', '\n'])
        .map(|i| i + 1)
        .unwrap_or(0);
    NEGATED_PREFIX.is_match(&prefix[tail_start..])
}
