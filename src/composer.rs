use std::collections::HashSet;

use crate::catalog::ReviewableItem;

/// Which pools a study session draws from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudyMode {
    Mixed,
    New,
    Review,
}

impl StudyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StudyMode::Mixed => "mixed",
            StudyMode::New => "new",
            StudyMode::Review => "review",
        }
    }

    pub fn from(s: &str) -> Option<Self> {
        match s {
            "mixed" => Some(StudyMode::Mixed),
            "new" => Some(StudyMode::New),
            "review" => Some(StudyMode::Review),
            _ => None,
        }
    }
}

/// Presentation direction of a study card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    PromptToAnswer,
    AnswerToPrompt,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::PromptToAnswer => "prompt_to_answer",
            Direction::AnswerToPrompt => "answer_to_prompt",
        }
    }
}

/// One entry in a composed study session
#[derive(Debug, Clone, PartialEq)]
pub struct StudyCard {
    pub item: ReviewableItem,
    pub direction: Direction,
    pub is_new: bool,
}

/// Assembles a bounded, ordered study session from pre-fetched pools.
///
/// `due` must arrive ordered by next review date ascending (most overdue
/// first) and `new` by the supplier's difficulty/random tiebreak; both
/// orders are preserved. Pure: suppliers run before this is called.
///
/// Mixed mode fills up to half the budget from due items, then new items.
/// The contract ends there; as a graceful degradation, any budget a thin
/// new pool leaves unused is backfilled from leftover due items rather
/// than returned as a short session. Direction alternates by position in
/// mixed mode (even positions are prompt-to-answer); the single-pool
/// modes present prompt-to-answer only.
///
/// Guarantees: at most `session_size` cards, no duplicate item ids, and an
/// empty result (never an error) when both pools are empty.
pub fn compose_session(
    session_size: usize,
    mode: StudyMode,
    due: Vec<ReviewableItem>,
    new: Vec<ReviewableItem>,
) -> Vec<StudyCard> {
    if session_size == 0 {
        return Vec::new();
    }

    let mut seen: HashSet<i64> = HashSet::new();
    let mut picked: Vec<(ReviewableItem, bool)> = Vec::new();

    match mode {
        StudyMode::Review => {
            for item in due {
                if picked.len() >= session_size {
                    break;
                }
                if seen.insert(item.id) {
                    picked.push((item, false));
                }
            }
        }
        StudyMode::New => {
            for item in new {
                if picked.len() >= session_size {
                    break;
                }
                if seen.insert(item.id) {
                    picked.push((item, true));
                }
            }
        }
        StudyMode::Mixed => {
            let due_budget = session_size.div_ceil(2);
            let mut leftover_due = Vec::new();

            for item in due {
                if picked.len() < due_budget && seen.insert(item.id) {
                    picked.push((item, false));
                } else {
                    leftover_due.push(item);
                }
            }
            for item in new {
                if picked.len() >= session_size {
                    break;
                }
                if seen.insert(item.id) {
                    picked.push((item, true));
                }
            }
            for item in leftover_due {
                if picked.len() >= session_size {
                    break;
                }
                if seen.insert(item.id) {
                    picked.push((item, false));
                }
            }
        }
    }

    picked
        .into_iter()
        .enumerate()
        .map(|(position, (item, is_new))| {
            let direction = match mode {
                StudyMode::Mixed if position % 2 == 1 => Direction::AnswerToPrompt,
                _ => Direction::PromptToAnswer,
            };
            StudyCard {
                item,
                direction,
                is_new,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ItemKind;

    fn item(id: i64) -> ReviewableItem {
        ReviewableItem {
            id,
            kind: ItemKind::Word,
            prompt: format!("prompt-{id}"),
            answer: format!("answer-{id}"),
            level: None,
            category: None,
            definition: None,
            example: None,
            tense: None,
        }
    }

    fn items(ids: &[i64]) -> Vec<ReviewableItem> {
        ids.iter().map(|&id| item(id)).collect()
    }

    #[test]
    fn test_never_exceeds_session_size() {
        let cards = compose_session(
            4,
            StudyMode::Mixed,
            items(&[1, 2, 3, 4, 5]),
            items(&[6, 7, 8, 9]),
        );
        assert_eq!(cards.len(), 4);
    }

    #[test]
    fn test_mixed_fills_due_half_first() {
        let cards = compose_session(6, StudyMode::Mixed, items(&[1, 2, 3, 4]), items(&[10, 11]));

        let ids: Vec<i64> = cards.iter().map(|c| c.item.id).collect();
        // Half the budget (3) from due in supplier order, then new, then
        // leftover due backfill.
        assert_eq!(ids, vec![1, 2, 3, 10, 11, 4]);
        let new_flags: Vec<bool> = cards.iter().map(|c| c.is_new).collect();
        assert_eq!(new_flags, vec![false, false, false, true, true, false]);
    }

    #[test]
    fn test_mixed_direction_alternates_by_position() {
        let cards = compose_session(5, StudyMode::Mixed, items(&[1, 2, 3]), items(&[4, 5]));

        for (position, card) in cards.iter().enumerate() {
            let expected = if position % 2 == 0 {
                Direction::PromptToAnswer
            } else {
                Direction::AnswerToPrompt
            };
            assert_eq!(card.direction, expected);
        }
    }

    #[test]
    fn test_new_mode_only_consults_new_pool() {
        let cards = compose_session(10, StudyMode::New, items(&[1, 2]), items(&[5, 6, 7]));

        let ids: Vec<i64> = cards.iter().map(|c| c.item.id).collect();
        assert_eq!(ids, vec![5, 6, 7]);
        assert!(cards.iter().all(|c| c.is_new));
        assert!(cards.iter().all(|c| c.direction == Direction::PromptToAnswer));
    }

    #[test]
    fn test_review_mode_only_consults_due_pool() {
        let cards = compose_session(2, StudyMode::Review, items(&[1, 2, 3]), items(&[5, 6]));

        let ids: Vec<i64> = cards.iter().map(|c| c.item.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(cards.iter().all(|c| !c.is_new));
    }

    #[test]
    fn test_no_duplicate_items_across_pools() {
        // Item 3 appears in both pools; it must show up once.
        let cards = compose_session(10, StudyMode::Mixed, items(&[1, 3]), items(&[3, 4]));

        let ids: Vec<i64> = cards.iter().map(|c| c.item.id).collect();
        assert_eq!(ids.len(), 3);
        let unique: std::collections::HashSet<i64> = ids.iter().copied().collect();
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn test_empty_pools_yield_empty_session() {
        let cards = compose_session(10, StudyMode::Mixed, Vec::new(), Vec::new());
        assert!(cards.is_empty());
    }

    #[test]
    fn test_zero_session_size() {
        let cards = compose_session(0, StudyMode::Mixed, items(&[1]), items(&[2]));
        assert!(cards.is_empty());
    }

    #[test]
    fn test_mixed_backfills_from_due_when_new_exhausted() {
        let cards = compose_session(6, StudyMode::Mixed, items(&[1, 2, 3, 4, 5, 6]), Vec::new());
        assert_eq!(cards.len(), 6);
        assert!(cards.iter().all(|c| !c.is_new));
    }

    #[test]
    fn test_mixed_all_new_when_nothing_due() {
        let cards = compose_session(4, StudyMode::Mixed, Vec::new(), items(&[1, 2, 3, 4, 5]));
        assert_eq!(cards.len(), 4);
        assert!(cards.iter().all(|c| c.is_new));
    }

    #[test]
    fn test_study_mode_round_trip() {
        for mode in [StudyMode::Mixed, StudyMode::New, StudyMode::Review] {
            assert_eq!(StudyMode::from(mode.as_str()), Some(mode));
        }
        assert_eq!(StudyMode::from("cram"), None);
    }
}
