// Feedback loop: turns the previous playlist's rating into an adjustment
// directive for the next prompt. Pure mapping, no state.
use crate::models::playlist::FeedbackContext;

/// Builds a feedback context from a prior rating, if any. Ratings outside
/// 1..=5 are ignored rather than guessed at.
pub fn from_rating(rating: Option<i32>, notes: Option<String>) -> Option<FeedbackContext> {
    let rating = rating?;
    if !(1..=5).contains(&rating) {
        return None;
    }
    Some(FeedbackContext {
        prior_rating: rating,
        prior_notes: notes.filter(|n| !n.trim().is_empty()),
    })
}

impl FeedbackContext {
    /// Deterministic directive text per rating bucket.
    pub fn directive(&self) -> &'static str {
        match self.prior_rating {
            r if r <= 2 => {
                "The last playlist missed. Be more specific this time: favor hidden gems and avoid mainstream picks."
            }
            3 => "The last playlist was just okay. Try different subgenres and deeper cuts.",
            _ => "The last playlist worked. Preserve the vibe, but add fresh variety.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_low_rating_pushes_hidden_gems() {
        for rating in [1, 2] {
            let ctx = from_rating(Some(rating), None).unwrap();
            assert!(ctx.directive().contains("hidden gems"));
            assert!(ctx.directive().contains("avoid mainstream"));
        }
    }

    #[test]
    fn test_middle_rating_asks_for_deeper_cuts() {
        let ctx = from_rating(Some(3), None).unwrap();
        assert!(ctx.directive().contains("deeper cuts"));
    }

    #[test]
    fn test_high_rating_preserves_the_vibe() {
        for rating in [4, 5] {
            let ctx = from_rating(Some(rating), None).unwrap();
            assert!(ctx.directive().contains("Preserve the vibe"));
            assert!(!ctx.directive().contains("avoid mainstream"));
        }
    }

    #[test]
    fn test_no_rating_means_no_directive() {
        assert!(from_rating(None, Some("notes".to_string())).is_none());
    }

    #[test]
    fn test_out_of_range_rating_is_ignored() {
        assert!(from_rating(Some(0), None).is_none());
        assert!(from_rating(Some(9), None).is_none());
    }

    #[test]
    fn test_blank_notes_are_dropped() {
        let ctx = from_rating(Some(2), Some("   ".to_string())).unwrap();
        assert!(ctx.prior_notes.is_none());
    }
}
