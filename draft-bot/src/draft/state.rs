// The durable draft record: turn counter, pick order, round configuration.

use serde::{Deserialize, Serialize};

use super::order;

/// The singleton draft state persisted in the key-value store.
///
/// `finished` is never stored: it is derived from the pick counter so it
/// can't drift out of sync with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftRecord {
    /// Set once by the start operation; never cleared.
    pub started: bool,
    /// Permutation of participant ids frozen at start. Empty before then.
    #[serde(default)]
    pub pick_order: Vec<String>,
    /// Total picks committed so far. Incremented by exactly one per
    /// successful auto-pick; never decremented.
    pub pick_number: u64,
    /// Number of rounds the draft runs.
    pub rounds: u32,
    /// Latch ensuring the current drafter is nudged at most once while
    /// their want-list sits empty. Reset every time the turn advances.
    #[serde(default)]
    pub drafter_notified: bool,
}

impl DraftRecord {
    pub fn new(rounds: u32) -> Self {
        DraftRecord {
            started: false,
            pick_order: Vec::new(),
            pick_number: 0,
            rounds,
            drafter_notified: false,
        }
    }

    pub fn player_count(&self) -> usize {
        self.pick_order.len()
    }

    pub fn current_round(&self) -> u64 {
        order::current_round(self.pick_number, self.player_count())
    }

    /// 1-based position of the upcoming pick within its round.
    pub fn pick_in_round(&self) -> u64 {
        match self.player_count() {
            0 => 0,
            n => self.pick_number % n as u64 + 1,
        }
    }

    pub fn has_finished(&self) -> bool {
        order::has_finished(self.pick_number, self.player_count(), self.rounds)
    }

    pub fn current_index(&self) -> Option<usize> {
        order::current_index(self.pick_number, self.player_count())
    }

    /// The participant holding the pick. `None` before the draft starts or
    /// after it finishes.
    pub fn current_drafter(&self) -> Option<&str> {
        if !self.started || self.has_finished() {
            return None;
        }
        self.current_index()
            .map(|i| self.pick_order[i].as_str())
    }

    /// Freeze the pick order and reset the turn counter. The order must be
    /// a permutation of participant ids with no duplicates.
    pub fn start(&mut self, pick_order: Vec<String>) {
        debug_assert!(
            {
                let mut sorted = pick_order.clone();
                sorted.sort();
                sorted.windows(2).all(|w| w[0] != w[1])
            },
            "pick order must not contain duplicates"
        );
        self.started = true;
        self.pick_order = pick_order;
        self.pick_number = 0;
        self.drafter_notified = false;
    }

    /// Advance the turn after a committed pick and re-arm the waiting
    /// notification for the next drafter.
    pub fn advance(&mut self) {
        debug_assert!(!self.has_finished(), "cannot advance a finished draft");
        self.pick_number += 1;
        self.drafter_notified = false;
    }

    /// Total number of picks the draft will commit once complete.
    pub fn total_picks(&self) -> u64 {
        u64::from(self.rounds) * self.player_count() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started_record(players: &[&str], rounds: u32) -> DraftRecord {
        let mut record = DraftRecord::new(rounds);
        record.start(players.iter().map(|s| s.to_string()).collect());
        record
    }

    #[test]
    fn new_record_is_idle() {
        let record = DraftRecord::new(11);
        assert!(!record.started);
        assert!(!record.has_finished());
        assert_eq!(record.current_drafter(), None);
        assert_eq!(record.total_picks(), 0);
    }

    #[test]
    fn start_freezes_order_and_resets_counter() {
        let mut record = DraftRecord::new(2);
        record.pick_number = 7; // garbage from a hypothetical prior run
        record.start(vec!["p1".into(), "p2".into(), "p3".into()]);
        assert!(record.started);
        assert_eq!(record.pick_number, 0);
        assert_eq!(record.player_count(), 3);
        assert_eq!(record.total_picks(), 6);
    }

    #[test]
    fn current_drafter_snakes() {
        let mut record = started_record(&["p1", "p2", "p3"], 2);
        let mut seen = Vec::new();
        while !record.has_finished() {
            seen.push(record.current_drafter().unwrap().to_string());
            record.advance();
        }
        assert_eq!(seen, vec!["p1", "p2", "p3", "p3", "p2", "p1"]);
    }

    #[test]
    fn finished_draft_has_no_drafter() {
        let mut record = started_record(&["p1"], 1);
        assert_eq!(record.current_drafter(), Some("p1"));
        record.advance();
        assert!(record.has_finished());
        assert_eq!(record.current_drafter(), None);
    }

    #[test]
    fn advance_resets_notified_latch() {
        let mut record = started_record(&["p1", "p2"], 1);
        record.drafter_notified = true;
        record.advance();
        assert!(!record.drafter_notified);
    }

    #[test]
    fn pick_in_round_is_one_based() {
        let mut record = started_record(&["p1", "p2", "p3"], 2);
        assert_eq!(record.pick_in_round(), 1);
        record.advance();
        assert_eq!(record.pick_in_round(), 2);
        record.advance();
        assert_eq!(record.pick_in_round(), 3);
        record.advance();
        assert_eq!(record.current_round(), 1);
        assert_eq!(record.pick_in_round(), 1);
    }

    #[test]
    fn serde_round_trip() {
        let mut record = started_record(&["p1", "p2"], 11);
        record.advance();
        record.drafter_notified = true;
        let json = serde_json::to_value(&record).unwrap();
        let back: DraftRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn missing_optional_fields_default() {
        // Records written before the notified latch existed deserialize
        // with it unset.
        let json = serde_json::json!({
            "started": false,
            "pick_number": 0,
            "rounds": 11
        });
        let record: DraftRecord = serde_json::from_value(json).unwrap();
        assert!(record.pick_order.is_empty());
        assert!(!record.drafter_notified);
    }
}
