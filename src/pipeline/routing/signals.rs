//! Lexical signals used by the deterministic safety override.
//!
//! Signals are whole words (with their common inflections), so a drug name
//! like "painkiller" is not read as a complaint of pain.

use std::sync::LazyLock;

use regex::Regex;

/// Words and phrases indicating the user is describing a symptom.
static SYMPTOM_SIGNALS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)\b(?:
            pains? | painful | (?:head|stomach|tooth|back|ear)?aches? | aching
            | hurts? | hurting | symptoms? | cramps? | cramping
            | nausea | nauseous | nauseated | dizzy | dizziness | fevers? | feverish
            | cough | coughs | coughing | bleeding | bleeds? | swelling | swollen
            | rash | rashes | vomit | vomits | vomiting | itch | itches | itchy | itching
            | numb | numbness | sore | soreness
            | short\ of\ breath | shortness\ of\ breath
            | feel(?:s|ing)?\ (?:sick|unwell|ill|faint|weak|nauseous|dizzy)
        )\b",
    )
    .expect("symptom signal pattern is valid")
});

/// Words indicating the user is asking about a medication.
static MEDICATION_SIGNALS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)\b(?:
            medications? | medicines? | drugs? | pills? | prescriptions? | prescribed
            | dosage | doses? | tablets? | capsules? | pharmacy | painkillers?
            | ibuprofen | paracetamol | acetaminophen | aspirin | antibiotics?
            | insulin | inhalers?
        )\b",
    )
    .expect("medication signal pattern is valid")
});

pub fn has_symptom_signal(text: &str) -> bool {
    SYMPTOM_SIGNALS.is_match(text)
}

pub fn has_medication_signal(text: &str) -> bool {
    MEDICATION_SIGNALS.is_match(text)
}

/// Both kinds of signal present: the message must be handled as a symptom.
pub fn requires_symptom_priority(text: &str) -> bool {
    has_symptom_signal(text) && has_medication_signal(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_symptom_signals() {
        assert!(has_symptom_signal("My head HURTS"));
        assert!(has_symptom_signal("I have a headache"));
        assert!(has_symptom_signal("I feel sick since this morning"));
        assert!(has_symptom_signal("shortness of breath when climbing stairs"));
        assert!(!has_symptom_signal("What time does the clinic open?"));
    }

    #[test]
    fn symptom_words_inside_other_words_ignored() {
        assert!(!has_symptom_signal("Can I take a painkiller together with my insulin?"));
        assert!(!has_symptom_signal("I feel I need a refill of my prescription"));
        assert!(!has_symptom_signal("Sorry, which pharmacy is closest?"));
        assert!(!has_symptom_signal("Is this a numbered list?"));
    }

    #[test]
    fn detects_medication_signals() {
        assert!(has_medication_signal("Can I take two Pills?"));
        assert!(has_medication_signal("what dose of ibuprofen"));
        assert!(has_medication_signal("Is a painkiller safe here?"));
        assert!(!has_medication_signal("I want to sleep better"));
        assert!(!has_medication_signal("I was drugstore shopping"));
    }

    #[test]
    fn priority_needs_both() {
        assert!(requires_symptom_priority("I feel dizzy after my new medication"));
        assert!(!requires_symptom_priority("When should I take my medication?"));
        assert!(!requires_symptom_priority("I have a fever"));
    }

    #[test]
    fn pure_medication_questions_keep_their_route() {
        assert!(!requires_symptom_priority(
            "Can I take a painkiller together with my insulin?"
        ));
        assert!(!requires_symptom_priority("I feel I need a refill of my prescription"));
    }
}
