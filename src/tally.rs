use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::model::{Response, TimeSlot};

/// What a user said about one slot. Distinct from a plain bool because a user
/// who never touched the slot has no opinion, and must stay out of both tallies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Available,
    Unavailable,
    NoOpinion,
}

/// Compact status line for the event list sidebar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "respondents", rename_all = "camelCase")]
pub enum EventStatus {
    NoResponses,
    Confirmed(usize),
    Responded(usize),
}

/// Aggregated view of one event's responses. Built fresh from a snapshot on
/// every read or push, never mutated incrementally.
#[derive(Debug, Default)]
pub struct Tally {
    respondents: BTreeSet<String>,
    by_slot: BTreeMap<String, BTreeMap<String, bool>>,
}

impl Tally {
    pub fn from_rows(rows: &[Response]) -> Self {
        let mut tally = Tally::default();
        for row in rows {
            tally.respondents.insert(row.user_name.clone());
            tally
                .by_slot
                .entry(row.time_slot_id.clone())
                .or_default()
                .insert(row.user_name.clone(), row.is_available);
        }
        tally
    }

    /// Users with at least one response row, for any slot. This is the
    /// denominator for consensus; there is no separate roster to consult.
    pub fn respondent_count(&self) -> usize {
        self.respondents.len()
    }

    pub fn availability(&self, slot_id: &str, user_name: &str) -> Availability {
        match self
            .by_slot
            .get(slot_id)
            .and_then(|answers| answers.get(user_name))
        {
            Some(true) => Availability::Available,
            Some(false) => Availability::Unavailable,
            None => Availability::NoOpinion,
        }
    }

    pub fn availability_count(&self, slot_id: &str) -> usize {
        self.by_slot
            .get(slot_id)
            .map(|answers| answers.values().filter(|available| **available).count())
            .unwrap_or(0)
    }

    pub fn available_users(&self, slot_id: &str) -> Vec<String> {
        self.users_answering(slot_id, true)
    }

    /// Only users who answered the slot with "no". Skipping a slot is not a no.
    pub fn unavailable_users(&self, slot_id: &str) -> Vec<String> {
        self.users_answering(slot_id, false)
    }

    fn users_answering(&self, slot_id: &str, wanted: bool) -> Vec<String> {
        self.by_slot
            .get(slot_id)
            .map(|answers| {
                answers
                    .iter()
                    .filter(|(_, available)| **available == wanted)
                    .map(|(name, _)| name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// True iff some slot was marked available by every respondent. The bar is
    /// all respondents, not all answerers of that slot, so a respondent who
    /// skipped the slot blocks consensus for it.
    pub fn has_consensus(&self, slots: &[TimeSlot]) -> bool {
        self.respondent_count() > 0
            && slots
                .iter()
                .any(|slot| self.availability_count(&slot.id) == self.respondent_count())
    }

    pub fn status(&self, slots: &[TimeSlot]) -> EventStatus {
        let respondents = self.respondent_count();
        if respondents == 0 {
            EventStatus::NoResponses
        } else if self.has_consensus(slots) {
            EventStatus::Confirmed(respondents)
        } else {
            EventStatus::Responded(respondents)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(slot_id: &str, user_name: &str, is_available: bool) -> Response {
        Response {
            event_id: "e1".to_owned(),
            time_slot_id: slot_id.to_owned(),
            user_name: user_name.to_owned(),
            is_available,
        }
    }

    fn slot(id: &str) -> TimeSlot {
        TimeSlot {
            id: id.to_owned(),
            event_id: "e1".to_owned(),
            date: "2026-09-05".to_owned(),
            time: "18:00".to_owned(),
        }
    }

    #[test]
    fn two_slot_scenario() {
        let rows = vec![
            row("s1", "Alice", true),
            row("s2", "Alice", false),
            row("s1", "Bob", true),
            row("s2", "Bob", true),
        ];
        let slots = [slot("s1"), slot("s2")];
        let tally = Tally::from_rows(&rows);

        assert_eq!(tally.respondent_count(), 2);
        assert_eq!(tally.availability_count("s1"), 2);
        assert!(tally.has_consensus(&slots));
        assert_eq!(tally.available_users("s1"), vec!["Alice", "Bob"]);
        assert_eq!(tally.unavailable_users("s2"), vec!["Alice"]);
        assert_eq!(tally.status(&slots), EventStatus::Confirmed(2));
    }

    #[test]
    fn no_responses_means_no_consensus() {
        let tally = Tally::from_rows(&[]);
        let slots = [slot("s1")];

        assert_eq!(tally.respondent_count(), 0);
        assert!(!tally.has_consensus(&slots));
        assert_eq!(tally.status(&slots), EventStatus::NoResponses);
    }

    #[test]
    fn skipped_slot_is_no_opinion_not_unavailable() {
        let rows = vec![row("s1", "Carol", true)];
        let tally = Tally::from_rows(&rows);

        assert_eq!(tally.availability("s2", "Carol"), Availability::NoOpinion);
        assert!(tally.unavailable_users("s2").is_empty());
        assert!(tally.available_users("s2").is_empty());
    }

    #[test]
    fn skipped_slot_still_blocks_consensus() {
        // Carol answered s1 only; Dave marked s2 available. s2 is available
        // for every answerer of s2, but not for every respondent.
        let rows = vec![row("s1", "Carol", true), row("s2", "Dave", true)];
        let slots = [slot("s1"), slot("s2")];
        let tally = Tally::from_rows(&rows);

        assert_eq!(tally.respondent_count(), 2);
        assert_eq!(tally.availability_count("s2"), 1);
        assert!(!tally.has_consensus(&slots));
        assert_eq!(tally.status(&slots), EventStatus::Responded(2));
    }

    #[test]
    fn availability_count_never_exceeds_respondent_count() {
        let rows = vec![
            row("s1", "Alice", true),
            row("s1", "Bob", true),
            row("s2", "Alice", true),
        ];
        let tally = Tally::from_rows(&rows);

        for slot_id in ["s1", "s2", "s3"] {
            assert!(tally.availability_count(slot_id) <= tally.respondent_count());
        }
    }

    #[test]
    fn three_valued_answers() {
        let rows = vec![row("s1", "Alice", true), row("s1", "Bob", false)];
        let tally = Tally::from_rows(&rows);

        assert_eq!(tally.availability("s1", "Alice"), Availability::Available);
        assert_eq!(tally.availability("s1", "Bob"), Availability::Unavailable);
        assert_eq!(tally.availability("s1", "Eve"), Availability::NoOpinion);
    }
}
