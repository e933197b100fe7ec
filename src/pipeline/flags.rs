//! Review-surface flags derived from a status code.
//!
//! Pure set-membership over pre-resolved named codes; the UI uses these to
//! decide what to show, while every mutation is still validated by the
//! transition guard.

use serde::Serialize;

use crate::registry::NamedCodes;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReviewFlags {
    pub is_editable: bool,
    pub can_edit_published_date: bool,
    pub show_move_to_review: bool,
    pub show_approve_reject: bool,
    pub show_reenrich: bool,
    pub show_approved_note: bool,
}

pub fn compute_review_flags(code: i32, codes: &NamedCodes) -> ReviewFlags {
    let NamedCodes {
        pending_enrichment: _,
        enriched,
        pending_review,
        approved,
        published,
        failed,
        rejected,
        dead_letter,
    } = *codes;

    ReviewFlags {
        is_editable: [enriched, pending_review, failed, rejected].contains(&code),
        can_edit_published_date: [enriched, pending_review, published].contains(&code),
        show_move_to_review: [enriched, failed, rejected].contains(&code),
        show_approve_reject: code == pending_review,
        show_reenrich: [enriched, pending_review, published, failed, rejected, dead_letter]
            .contains(&code),
        show_approved_note: [approved, published].contains(&code),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::StatusRegistry;

    fn codes() -> NamedCodes {
        NamedCodes::resolve(&StatusRegistry::seeded()).unwrap()
    }

    #[test]
    fn test_pending_review_flags() {
        let flags = compute_review_flags(300, &codes());
        assert!(flags.is_editable);
        assert!(flags.show_approve_reject);
        assert!(flags.show_reenrich);
        assert!(!flags.show_move_to_review);
        assert!(!flags.show_approved_note);
    }

    #[test]
    fn test_enriched_flags() {
        let flags = compute_review_flags(240, &codes());
        assert!(flags.is_editable);
        assert!(flags.show_move_to_review);
        assert!(flags.can_edit_published_date);
        assert!(!flags.show_approve_reject);
    }

    #[test]
    fn test_published_flags() {
        let flags = compute_review_flags(400, &codes());
        assert!(!flags.is_editable);
        assert!(flags.can_edit_published_date);
        assert!(flags.show_reenrich);
        assert!(flags.show_approved_note);
    }

    #[test]
    fn test_mid_enrichment_shows_nothing() {
        let flags = compute_review_flags(211, &codes());
        assert_eq!(
            flags,
            ReviewFlags {
                is_editable: false,
                can_edit_published_date: false,
                show_move_to_review: false,
                show_approve_reject: false,
                show_reenrich: false,
                show_approved_note: false,
            }
        );
    }

    #[test]
    fn test_dead_letter_only_reenrich() {
        let flags = compute_review_flags(550, &codes());
        assert!(flags.show_reenrich);
        assert!(!flags.is_editable);
    }
}
