// Mood classifier: free text in, coarse mood category + musical descriptors out.
use crate::models::mood::{descriptors, MoodCategory, MoodProfile};

/// Keyword stems per category, checked in order; the first matching rule
/// wins, so the order here is load-bearing.
const RULES: &[(MoodCategory, &[&str])] = &[
    (
        MoodCategory::Sad,
        &["sad", "depress", "down", "cry", "hurt", "lost", "alone", "heartbreak"],
    ),
    (
        MoodCategory::Happy,
        &["happy", "joy", "excit", "amaz", "great", "wonderful", "celebrat"],
    ),
    (
        MoodCategory::Calm,
        &["calm", "relax", "peace", "chill", "quiet", "ease", "tranquil"],
    ),
    (
        MoodCategory::Angry,
        &["angry", "mad", "frust", "piss", "annoy", "hate", "rage"],
    ),
    (
        MoodCategory::Energetic,
        &["energy", "pump", "hype", "party", "dance", "workout"],
    ),
    (
        MoodCategory::Melancholic,
        &["nostalg", "remember", "past", "bittersweet", "wistful"],
    ),
    (
        MoodCategory::Reflective,
        &["think", "wonder", "contemplate", "ponder", "reflect", "3am"],
    ),
];

/// Maps free text to a mood profile. Pure, total and deterministic: any
/// input yields a profile, unmatched input falls back to calm.
pub fn classify(text: &str) -> MoodProfile {
    let lower = text.to_lowercase();

    for (category, stems) in RULES {
        if stems.iter().any(|stem| lower.contains(stem)) {
            return descriptors(*category);
        }
    }

    descriptors(MoodCategory::Calm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_is_deterministic() {
        let a = classify("feeling kind of heartbroken tonight");
        let b = classify("feeling kind of heartbroken tonight");
        assert_eq!(a, b);
        assert_eq!(a.category, MoodCategory::Sad);
    }

    #[test]
    fn test_classify_late_night_is_reflective() {
        let profile = classify("3am and can't sleep");
        assert_eq!(profile.category, MoodCategory::Reflective);
        assert!(profile.genre_hints.contains(&"singer-songwriter"));
    }

    #[test]
    fn test_first_matching_rule_wins() {
        // "sad" outranks "party" because the sad rule is checked first.
        assert_eq!(classify("sad but ready to party").category, MoodCategory::Sad);
        // "wonderful" hits the happy stems before the reflective "wonder" stem.
        assert_eq!(classify("what a wonderful day").category, MoodCategory::Happy);
    }

    #[test]
    fn test_classify_is_case_insensitive() {
        assert_eq!(classify("SO MUCH RAGE").category, MoodCategory::Angry);
    }

    #[test]
    fn test_unmatched_input_defaults_to_calm() {
        let profile = classify("xylophone weather report");
        assert_eq!(profile.category, MoodCategory::Calm);
        assert_eq!(profile.energy_level, "Low");
    }

    #[test]
    fn test_empty_input_still_yields_a_profile() {
        assert_eq!(classify("").category, MoodCategory::Calm);
    }
}
