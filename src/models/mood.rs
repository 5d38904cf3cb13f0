use serde::Serialize;

/// Coarse mood buckets the classifier can land on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MoodCategory {
    Sad,
    Happy,
    Calm,
    Angry,
    Energetic,
    Melancholic,
    Reflective,
}

impl MoodCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            MoodCategory::Sad => "sad",
            MoodCategory::Happy => "happy",
            MoodCategory::Calm => "calm",
            MoodCategory::Angry => "angry",
            MoodCategory::Energetic => "energetic",
            MoodCategory::Melancholic => "melancholic",
            MoodCategory::Reflective => "reflective",
        }
    }
}

/// Musical characteristics attached to a detected mood. Enriches the prompt
/// only; never filters or rejects input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MoodProfile {
    pub category: MoodCategory,
    pub tempo_range: &'static str,
    pub energy_level: &'static str,
    pub genre_hints: &'static [&'static str],
}

/// Descriptor bundle per mood category.
pub const fn descriptors(category: MoodCategory) -> MoodProfile {
    match category {
        MoodCategory::Sad => MoodProfile {
            category,
            tempo_range: "60-80 BPM",
            energy_level: "Low",
            genre_hints: &["indie folk", "slowcore", "sad pop", "acoustic", "piano ballads"],
        },
        MoodCategory::Happy => MoodProfile {
            category,
            tempo_range: "115-160 BPM",
            energy_level: "High",
            genre_hints: &["pop", "funk", "dance", "upbeat indie", "feel-good rock"],
        },
        MoodCategory::Calm => MoodProfile {
            category,
            tempo_range: "50-70 BPM",
            energy_level: "Low",
            genre_hints: &["ambient", "classical", "lo-fi", "chill", "acoustic"],
        },
        MoodCategory::Angry => MoodProfile {
            category,
            tempo_range: "120-180 BPM",
            energy_level: "High",
            genre_hints: &["punk", "metal", "hard rock", "aggressive rap", "industrial"],
        },
        MoodCategory::Energetic => MoodProfile {
            category,
            tempo_range: "120-160 BPM",
            energy_level: "High",
            genre_hints: &["EDM", "electronic", "dance", "workout", "upbeat rock"],
        },
        MoodCategory::Melancholic => MoodProfile {
            category,
            tempo_range: "65-85 BPM",
            energy_level: "Low-Medium",
            genre_hints: &["indie rock", "dream pop", "post-rock", "alternative", "shoegaze"],
        },
        MoodCategory::Reflective => MoodProfile {
            category,
            tempo_range: "60-90 BPM",
            energy_level: "Low-Medium",
            genre_hints: &["singer-songwriter", "folk", "indie", "acoustic", "introspective"],
        },
    }
}
