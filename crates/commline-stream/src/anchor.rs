// SPDX-FileCopyrightText: 2026 Commline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scroll anchoring for the conversation view.
//!
//! Decides whether the view should auto-follow new content or preserve the
//! reader's position, and counts unseen arrivals while the reader is
//! scrolled back. Pure function of scroll position and content deltas; holds
//! no network state.

/// What the view should do when new content arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorAction {
    /// The viewport is near the newest content: scroll to it.
    AutoScroll,
    /// The reader is scrolled back: keep their position.
    Preserve,
}

/// Follow/preserve state for one conversation view.
#[derive(Debug, Clone)]
pub struct ScrollAnchor {
    /// Distance from the newest content within which the view auto-follows.
    follow_threshold: f64,
    /// Current distance of the viewport from the newest content.
    distance_from_latest: f64,
    /// Messages that arrived while the reader was scrolled back.
    unseen: u32,
}

impl ScrollAnchor {
    /// Create an anchor with the given follow threshold (viewport units).
    pub fn new(follow_threshold: f64) -> Self {
        Self {
            follow_threshold,
            distance_from_latest: 0.0,
            unseen: 0,
        }
    }

    /// Whether the view is currently auto-following new content.
    pub fn following(&self) -> bool {
        self.distance_from_latest <= self.follow_threshold
    }

    /// Count of arrivals the reader has not seen.
    pub fn unseen_count(&self) -> u32 {
        self.unseen
    }

    /// Record a scroll to `distance_from_latest` units above the newest
    /// content. Re-entering the follow zone clears the unseen counter.
    pub fn on_scroll(&mut self, distance_from_latest: f64) {
        self.distance_from_latest = distance_from_latest.max(0.0);
        if self.following() {
            self.unseen = 0;
        }
    }

    /// Record the arrival of new content.
    ///
    /// While following, the viewport tracks the newest content and the unseen
    /// counter stays at zero. While scrolled back, the position is preserved
    /// and the counter increments, backing the "jump to latest" affordance.
    pub fn on_new_content(&mut self) -> AnchorAction {
        if self.following() {
            self.distance_from_latest = 0.0;
            AnchorAction::AutoScroll
        } else {
            self.unseen = self.unseen.saturating_add(1);
            AnchorAction::Preserve
        }
    }

    /// Jump to the newest content: resumes following and clears the counter.
    pub fn jump_to_latest(&mut self) {
        self.distance_from_latest = 0.0;
        self.unseen = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_following_at_latest() {
        let anchor = ScrollAnchor::new(100.0);
        assert!(anchor.following());
        assert_eq!(anchor.unseen_count(), 0);
    }

    #[test]
    fn new_content_while_following_auto_scrolls() {
        let mut anchor = ScrollAnchor::new(100.0);
        anchor.on_scroll(40.0);
        assert!(anchor.following());
        assert_eq!(anchor.on_new_content(), AnchorAction::AutoScroll);
        assert_eq!(anchor.unseen_count(), 0);
        // Auto-scroll snaps the viewport back to the newest content.
        assert!(anchor.following());
    }

    #[test]
    fn new_content_while_scrolled_back_preserves_and_counts() {
        let mut anchor = ScrollAnchor::new(100.0);
        anchor.on_scroll(400.0);
        assert!(!anchor.following());
        assert_eq!(anchor.on_new_content(), AnchorAction::Preserve);
        assert_eq!(anchor.on_new_content(), AnchorAction::Preserve);
        assert_eq!(anchor.unseen_count(), 2);
    }

    #[test]
    fn threshold_boundary_is_inclusive() {
        let mut anchor = ScrollAnchor::new(100.0);
        anchor.on_scroll(100.0);
        assert!(anchor.following());
        anchor.on_scroll(100.1);
        assert!(!anchor.following());
    }

    #[test]
    fn scrolling_back_into_follow_zone_clears_unseen() {
        let mut anchor = ScrollAnchor::new(100.0);
        anchor.on_scroll(500.0);
        anchor.on_new_content();
        anchor.on_new_content();
        assert_eq!(anchor.unseen_count(), 2);

        anchor.on_scroll(10.0);
        assert!(anchor.following());
        assert_eq!(anchor.unseen_count(), 0);
    }

    #[test]
    fn jump_to_latest_resumes_following() {
        let mut anchor = ScrollAnchor::new(100.0);
        anchor.on_scroll(900.0);
        anchor.on_new_content();
        assert_eq!(anchor.unseen_count(), 1);

        anchor.jump_to_latest();
        assert!(anchor.following());
        assert_eq!(anchor.unseen_count(), 0);
        assert_eq!(anchor.on_new_content(), AnchorAction::AutoScroll);
    }

    #[test]
    fn negative_scroll_positions_are_clamped() {
        let mut anchor = ScrollAnchor::new(100.0);
        anchor.on_scroll(-25.0);
        assert!(anchor.following());
    }
}
