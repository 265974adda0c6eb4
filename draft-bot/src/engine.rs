// The draft engine: item catalog, participant registry, and draft record as
// one aggregate behind a small synchronous API.
//
// Every mutating operation follows the same build-then-commit shape: the
// post-operation records are constructed on clones, written durably, and only
// then installed in memory. A failed write therefore leaves the engine
// exactly as it was, which is what makes tick retries safe.

use anyhow::Context;
use rand::seq::SliceRandom;
use serde::Serialize;
use tracing::{debug, info};

use crate::catalog::{normalize_id, Item, ItemCatalog};
use crate::config::Config;
use crate::db::Database;
use crate::draft::state::DraftRecord;
use crate::error::{CommandError, TickError};
use crate::registry::{parse_team_spec, Participant, Registry, WANTLIST_MAX_LENGTH};

// ---------------------------------------------------------------------------
// Views and outcomes
// ---------------------------------------------------------------------------

/// Lifecycle phase derived from the draft record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DraftPhase {
    NotStarted,
    InProgress,
    Finished,
}

/// Read-only snapshot of where the draft stands.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusView {
    pub phase: DraftPhase,
    /// 1-based round of the upcoming pick (0 before the draft starts).
    pub round: u64,
    /// 1-based position of the upcoming pick within its round.
    pub pick_in_round: u64,
    /// Team currently on the clock, if any.
    pub current_team: Option<String>,
    pub picks_committed: u64,
    pub total_picks: u64,
}

/// What a single auto-pick evaluation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Draft not started: nothing to do.
    Idle,
    /// Every round is complete: terminal, nothing to do.
    Finished,
    /// The current drafter's want-list is empty. `first_notice` is true only
    /// on the tick that latched the reminder; later ticks stay quiet.
    Waiting {
        drafter: String,
        round: u64,
        pick_in_round: u64,
        first_notice: bool,
    },
    /// An item was committed and the turn advanced.
    Picked {
        drafter: String,
        team_name: String,
        item_name: String,
        round: u64,
        pick_in_round: u64,
    },
}

// ---------------------------------------------------------------------------
// DraftEngine
// ---------------------------------------------------------------------------

/// The aggregate owning the three mutually-consistent record families. All
/// mutation goes through its methods; the app loop owns the only instance,
/// so each method call is an atomic unit of work.
#[derive(Debug)]
pub struct DraftEngine {
    catalog: ItemCatalog,
    registry: Registry,
    record: DraftRecord,
    db: Database,
    require_abbreviation: bool,
}

impl DraftEngine {
    /// Construct the engine from a database, seeding or resuming as needed.
    ///
    /// A database without a draft record is brand new: the catalog is seeded
    /// from the configured item list and persisted. A database that already
    /// holds a record is an existing session: the list file is ignored and
    /// every record family is loaded from storage, preserving progress.
    pub fn bootstrap(config: &Config, db: Database) -> anyhow::Result<Self> {
        if db.load_draft_record()?.is_some() {
            return Self::resume(config, db);
        }

        let text = std::fs::read_to_string(&config.draft.item_list).with_context(|| {
            format!("failed to read item list at {}", config.draft.item_list)
        })?;
        Self::first_init(config, db, text.lines())
    }

    /// Seed a brand-new database from item display names. Refuses to touch a
    /// database that already holds a draft record.
    pub fn first_init<I>(config: &Config, db: Database, names: I) -> anyhow::Result<Self>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        if db.load_draft_record()?.is_some() {
            anyhow::bail!("database is already initialized; refusing to reseed the catalog");
        }

        let catalog = ItemCatalog::from_names(names);
        if catalog.is_empty() {
            anyhow::bail!("item list is empty; nothing to draft");
        }

        let record = DraftRecord::new(config.draft.rounds);
        let draft_id = Database::generate_draft_id();
        db.initialize(catalog.items(), &record, &draft_id)?;
        info!(
            "Seeded catalog with {} items (session {})",
            catalog.len(),
            draft_id
        );

        Ok(DraftEngine {
            catalog,
            registry: Registry::default(),
            record,
            db,
            require_abbreviation: config.draft.team_abbreviations,
        })
    }

    /// Rebuild the engine from previously persisted records.
    pub fn resume(config: &Config, db: Database) -> anyhow::Result<Self> {
        let record = db
            .load_draft_record()?
            .context("cannot resume: no draft record stored")?;
        let catalog = ItemCatalog::from_items(db.load_items()?);
        let registry = Registry::from_participants(db.load_participants()?);

        let engine = DraftEngine {
            catalog,
            registry,
            record,
            db,
            require_abbreviation: config.draft.team_abbreviations,
        };
        // A corrupt store must not silently resume; a draft that picks from
        // inconsistent records would corrupt history further.
        engine
            .check_consistency()
            .map_err(|msg| anyhow::anyhow!("stored draft state is inconsistent: {msg}"))?;

        info!(
            "Resumed session {} with {} items, {} participants, {} picks committed",
            engine.db.load_draft_id()?.unwrap_or_else(|| "unknown".into()),
            engine.catalog.len(),
            engine.registry.len(),
            engine.record.pick_number
        );
        Ok(engine)
    }

    // ------------------------------------------------------------------
    // Command operations
    // ------------------------------------------------------------------

    /// Register a new participant with a team identity.
    pub fn register(
        &mut self,
        user_id: &str,
        display_name: &str,
        team_spec: &str,
    ) -> Result<Participant, CommandError> {
        let id = normalize_user_id(user_id);
        if self.registry.contains(&id) {
            return Err(CommandError::AlreadyRegistered);
        }
        if self.record.started {
            return Err(CommandError::DraftAlreadyStarted);
        }

        let spec = parse_team_spec(team_spec, self.require_abbreviation)?;
        if self.registry.name_in_use(&spec.team_name) {
            return Err(CommandError::NameInUse(spec.team_name));
        }
        if let Some(abbr) = &spec.abbreviation {
            if self.registry.abbreviation_in_use(abbr) {
                return Err(CommandError::AbbreviationInUse(abbr.clone()));
            }
        }

        let participant = Participant::new(
            id,
            display_name.to_string(),
            spec.team_name,
            spec.abbreviation,
        );
        self.db.save_participant(&participant)?;
        self.registry.insert(participant.clone());
        info!(
            "Registered {} as The {}",
            participant.display_name, participant.team_name
        );
        Ok(participant)
    }

    /// Freeze the pick order and open the draft. Returns the team names in
    /// pick order for the start announcement.
    pub fn start_draft(&mut self) -> Result<Vec<String>, CommandError> {
        if self.record.has_finished() {
            return Err(CommandError::DraftFinished);
        }
        if self.record.started {
            return Err(CommandError::DraftAlreadyStarted);
        }
        if self.registry.is_empty() {
            return Err(CommandError::NoParticipants);
        }

        let mut order = self.registry.ids();
        order.shuffle(&mut rand::thread_rng());

        let mut record = self.record.clone();
        record.start(order);
        self.db.save_draft_record(&record)?;
        self.record = record;

        let team_names = self.ordered_team_names();
        info!("Draft started, order: {}", team_names.join(", "));
        Ok(team_names)
    }

    /// Append an item to the caller's want-list. The query resolves by exact
    /// id first, then by substring search; duplicates in the list are
    /// allowed (repeat priority). Returns the updated list as display names.
    pub fn want(&mut self, user_id: &str, query: &str) -> Result<Vec<String>, CommandError> {
        let id = normalize_user_id(user_id);
        if !self.registry.contains(&id) {
            return Err(CommandError::NotRegistered);
        }
        if self.record.has_finished() {
            return Err(CommandError::DraftFinished);
        }

        let item = self.resolve_item(query)?.clone();
        if item.taken {
            return Err(CommandError::ItemAlreadyTaken(item.display_name));
        }

        let mut updated = match self.registry.get(&id) {
            Some(p) => p.clone(),
            None => return Err(CommandError::NotRegistered),
        };
        if updated.want_list.len() >= WANTLIST_MAX_LENGTH {
            return Err(CommandError::WantListFull(WANTLIST_MAX_LENGTH));
        }
        updated.want_list.push(item.id);

        self.db.save_participant(&updated)?;
        let names = self.want_list_names(&updated);
        self.registry.replace(updated);
        Ok(names)
    }

    /// Empty the caller's want-list. Allowed in any draft phase.
    pub fn clear_want_list(&mut self, user_id: &str) -> Result<(), CommandError> {
        let id = normalize_user_id(user_id);
        let mut updated = match self.registry.get(&id) {
            Some(p) => p.clone(),
            None => return Err(CommandError::NotRegistered),
        };
        updated.want_list.clear();
        self.db.save_participant(&updated)?;
        self.registry.replace(updated);
        Ok(())
    }

    /// Substring search over the catalog. Pure read; an empty result is a
    /// valid outcome, not an error.
    pub fn search(&self, fragment: &str) -> Vec<String> {
        self.catalog
            .search(fragment)
            .into_iter()
            .map(|i| i.display_name.clone())
            .collect()
    }

    /// Where the draft stands right now. Pure read.
    pub fn status(&self) -> StatusView {
        let phase = if self.record.has_finished() {
            DraftPhase::Finished
        } else if self.record.started {
            DraftPhase::InProgress
        } else {
            DraftPhase::NotStarted
        };
        let current_team = self
            .record
            .current_drafter()
            .and_then(|id| self.registry.get(id))
            .map(|p| p.team_name.clone());
        StatusView {
            phase,
            round: if self.record.started {
                self.record.current_round() + 1
            } else {
                0
            },
            pick_in_round: if self.record.started {
                self.record.pick_in_round()
            } else {
                0
            },
            current_team,
            picks_committed: self.record.pick_number,
            total_picks: self.record.total_picks(),
        }
    }

    // ------------------------------------------------------------------
    // The auto-pick tick
    // ------------------------------------------------------------------

    /// Evaluate one auto-pick step.
    ///
    /// Commits the current drafter's highest-priority available item, or
    /// latches a one-time reminder when their want-list is empty. The whole
    /// step is atomic: the durable write happens before any in-memory state
    /// changes, so a persistence failure leaves nothing to undo and the next
    /// tick simply retries.
    pub fn tick(&mut self) -> Result<TickOutcome, TickError> {
        if !self.record.started {
            return Ok(TickOutcome::Idle);
        }
        if self.record.has_finished() {
            return Ok(TickOutcome::Finished);
        }

        let drafter_id = self
            .record
            .current_drafter()
            .ok_or_else(|| {
                TickError::Consistency("started draft has no current drafter".to_string())
            })?
            .to_string();
        let drafter = self.registry.get(&drafter_id).ok_or_else(|| {
            TickError::Consistency(format!(
                "pick order references unknown participant '{drafter_id}'"
            ))
        })?;

        let round = self.record.current_round();
        let pick_in_round = self.record.pick_in_round();

        // Empty want-list: the waiting sub-state. Nudge the drafter once,
        // then stay quiet until the turn advances.
        let Some(head_id) = drafter.want_list.first().cloned() else {
            if self.record.drafter_notified {
                debug!("waiting on {drafter_id}, already notified");
                return Ok(TickOutcome::Waiting {
                    drafter: drafter_id,
                    round,
                    pick_in_round,
                    first_notice: false,
                });
            }
            let mut record = self.record.clone();
            record.drafter_notified = true;
            self.db.save_draft_record(&record)?;
            self.record = record;
            return Ok(TickOutcome::Waiting {
                drafter: drafter_id,
                round,
                pick_in_round,
                first_notice: true,
            });
        };

        let item = self.catalog.get(&head_id).ok_or_else(|| {
            TickError::Consistency(format!(
                "want-list of '{drafter_id}' references unknown item '{head_id}'"
            ))
        })?;
        // Any item transitioning to taken is purged from every want-list in
        // the same commit, so a taken head means the records have diverged.
        if item.taken {
            return Err(TickError::Consistency(format!(
                "taken item '{}' found at the head of '{}'s want-list",
                item.display_name, drafter_id
            )));
        }
        let item_name = item.display_name.clone();
        let team_name = drafter.team_name.clone();

        // Build the post-pick records: the drafter gains the item, every
        // list loses every occurrence of it (it may be queued by several
        // participants, or several times by one).
        let mut mutated: Vec<Participant> = Vec::new();
        for participant in self.registry.iter() {
            let wants_it = participant.want_list.iter().any(|w| w == &head_id);
            let is_drafter = participant.id == drafter_id;
            if !wants_it && !is_drafter {
                continue;
            }
            let mut updated = participant.clone();
            updated.want_list.retain(|w| w != &head_id);
            if is_drafter {
                updated.drafted_items.push(head_id.clone());
            }
            mutated.push(updated);
        }

        let mut record = self.record.clone();
        record.advance();

        self.db.commit_pick(&head_id, &mutated, &record)?;

        // Durable; now install.
        self.catalog.mark_taken(&head_id);
        for participant in mutated {
            self.registry.replace(participant);
        }
        self.record = record;

        info!(
            "Round {} pick {}: The {} take {}",
            round + 1,
            pick_in_round,
            team_name,
            item_name
        );
        Ok(TickOutcome::Picked {
            drafter: drafter_id,
            team_name,
            item_name,
            round,
            pick_in_round,
        })
    }

    // ------------------------------------------------------------------
    // Consistency audit
    // ------------------------------------------------------------------

    /// Verify the taken/want-list/drafted-items invariant across all
    /// records: a taken item lives in exactly one participant's drafted
    /// items and in no want-list; an available item is drafted by no one.
    pub fn check_consistency(&self) -> Result<(), String> {
        for item in self.catalog.items() {
            let holders = self
                .registry
                .iter()
                .filter(|p| p.drafted_items.iter().any(|d| d == &item.id))
                .count();
            let wanted = self
                .registry
                .iter()
                .any(|p| p.want_list.iter().any(|w| w == &item.id));

            if item.taken {
                if holders != 1 {
                    return Err(format!(
                        "taken item '{}' is drafted by {holders} participants",
                        item.id
                    ));
                }
                if wanted {
                    return Err(format!(
                        "taken item '{}' still appears in a want-list",
                        item.id
                    ));
                }
            } else if holders != 0 {
                return Err(format!(
                    "available item '{}' appears in drafted items",
                    item.id
                ));
            }
        }

        let drafted_total: u64 = self
            .registry
            .iter()
            .map(|p| p.drafted_items.len() as u64)
            .sum();
        if drafted_total != self.record.pick_number {
            return Err(format!(
                "{} items drafted but pick counter says {}",
                drafted_total, self.record.pick_number
            ));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// Resolve an item query: exact id match first, then substring search.
    fn resolve_item(&self, query: &str) -> Result<&Item, CommandError> {
        let normalized = normalize_id(query);
        if let Some(item) = self.catalog.get(&normalized) {
            return Ok(item);
        }
        let matches = self.catalog.search(&normalized);
        match matches.len() {
            0 => Err(CommandError::NoMatch(query.trim().to_string())),
            1 => Ok(matches[0]),
            _ => Err(CommandError::AmbiguousQuery {
                query: query.trim().to_string(),
                matches: matches.iter().map(|i| i.display_name.clone()).collect(),
            }),
        }
    }

    fn want_list_names(&self, participant: &Participant) -> Vec<String> {
        participant
            .want_list
            .iter()
            .map(|id| {
                self.catalog
                    .get(id)
                    .map(|i| i.display_name.clone())
                    .unwrap_or_else(|| id.clone())
            })
            .collect()
    }

    fn ordered_team_names(&self) -> Vec<String> {
        self.record
            .pick_order
            .iter()
            .map(|id| {
                self.registry
                    .get(id)
                    .map(|p| p.team_name.clone())
                    .unwrap_or_else(|| id.clone())
            })
            .collect()
    }

    pub fn participant(&self, user_id: &str) -> Option<&Participant> {
        self.registry.get(&normalize_user_id(user_id))
    }

    pub fn pick_order(&self) -> &[String] {
        &self.record.pick_order
    }
}

/// Normalize a platform user reference into a stable participant id.
fn normalize_user_id(user_id: &str) -> String {
    user_id.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, DatabaseConfig, DraftConfig, NotificationsConfig};

    // -----------------------------------------------------------------------
    // Test helpers
    // -----------------------------------------------------------------------

    const ITEMS: &[&str] = &["Alpha", "Bravo", "Charlie", "Delta"];

    fn test_config(rounds: u32) -> Config {
        Config {
            draft: DraftConfig {
                rounds,
                tick_seconds: 5,
                item_list: "unused".to_string(),
                team_abbreviations: false,
            },
            database: DatabaseConfig {
                path: ":memory:".to_string(),
            },
            notifications: NotificationsConfig {
                channel: "#draft".to_string(),
            },
        }
    }

    fn test_engine(rounds: u32) -> DraftEngine {
        let db = Database::open(":memory:").unwrap();
        DraftEngine::first_init(&test_config(rounds), db, ITEMS).unwrap()
    }

    /// Register three participants and start the draft. Returns the frozen
    /// pick order (participant ids).
    fn started_engine(rounds: u32) -> (DraftEngine, Vec<String>) {
        let mut engine = test_engine(rounds);
        engine.register("P1", "P1", "Team One").unwrap();
        engine.register("P2", "P2", "Team Two").unwrap();
        engine.register("P3", "P3", "Team Three").unwrap();
        engine.start_draft().unwrap();
        let order = engine.pick_order().to_vec();
        (engine, order)
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    #[test]
    fn register_creates_participant_with_empty_lists() {
        let mut engine = test_engine(2);
        let p = engine.register("Alice", "Alice", "The Mudcats").unwrap();
        assert_eq!(p.id, "alice");
        assert_eq!(p.team_name, "The Mudcats");
        assert!(p.want_list.is_empty());
        assert!(p.drafted_items.is_empty());
    }

    #[test]
    fn register_twice_is_a_conflict() {
        let mut engine = test_engine(2);
        engine.register("alice", "Alice", "Mudcats").unwrap();
        let err = engine.register("ALICE", "Alice", "Vorticists").unwrap_err();
        assert!(matches!(err, CommandError::AlreadyRegistered));
    }

    #[test]
    fn duplicate_team_name_rejected_after_normalization() {
        let mut engine = test_engine(2);
        engine.register("alice", "Alice", "Mudcats").unwrap();
        let err = engine.register("bob", "Bob", "MUDCATS").unwrap_err();
        assert!(matches!(err, CommandError::NameInUse(_)));
    }

    #[test]
    fn duplicate_abbreviation_rejected() {
        let db = Database::open(":memory:").unwrap();
        let mut config = test_config(2);
        config.draft.team_abbreviations = true;
        let mut engine = DraftEngine::first_init(&config, db, ITEMS).unwrap();

        engine.register("alice", "Alice", "Mudcats MUD").unwrap();
        let err = engine.register("bob", "Bob", "Mudlarks MUD").unwrap_err();
        assert!(matches!(err, CommandError::AbbreviationInUse(_)));
    }

    #[test]
    fn register_after_start_rejected() {
        let (mut engine, _) = started_engine(2);
        let err = engine.register("dave", "Dave", "Latecomers").unwrap_err();
        assert!(matches!(err, CommandError::DraftAlreadyStarted));
    }

    // -----------------------------------------------------------------------
    // Start
    // -----------------------------------------------------------------------

    #[test]
    fn start_freezes_a_permutation_of_registered_ids() {
        let (engine, order) = started_engine(2);
        let mut sorted = order.clone();
        sorted.sort();
        assert_eq!(sorted, vec!["p1", "p2", "p3"]);
        assert_eq!(engine.status().phase, DraftPhase::InProgress);
    }

    #[test]
    fn start_twice_rejected() {
        let (mut engine, _) = started_engine(2);
        let err = engine.start_draft().unwrap_err();
        assert!(matches!(err, CommandError::DraftAlreadyStarted));
    }

    #[test]
    fn start_with_no_participants_rejected() {
        let mut engine = test_engine(2);
        let err = engine.start_draft().unwrap_err();
        assert!(matches!(err, CommandError::NoParticipants));
    }

    #[test]
    fn start_after_finish_rejected() {
        let mut engine = test_engine(1);
        engine.register("p1", "P1", "Solo").unwrap();
        engine.start_draft().unwrap();
        engine.want("p1", "alpha").unwrap();
        assert!(matches!(engine.tick(), Ok(TickOutcome::Picked { .. })));
        assert!(engine.status().phase == DraftPhase::Finished);
        let err = engine.start_draft().unwrap_err();
        assert!(matches!(err, CommandError::DraftFinished));
    }

    // -----------------------------------------------------------------------
    // Want / clear / search
    // -----------------------------------------------------------------------

    #[test]
    fn want_exact_then_substring_resolution() {
        let mut engine = test_engine(2);
        engine.register("alice", "Alice", "Mudcats").unwrap();

        let list = engine.want("alice", "Alpha").unwrap();
        assert_eq!(list, vec!["Alpha"]);

        // Substring fallback.
        let list = engine.want("alice", "rav").unwrap();
        assert_eq!(list, vec!["Alpha", "Bravo"]);

        let err = engine.want("alice", "zz").unwrap_err();
        assert!(matches!(err, CommandError::NoMatch(_)));
    }

    #[test]
    fn ambiguous_query_reports_all_matches() {
        let mut engine = test_engine(2);
        engine.register("alice", "Alice", "Mudcats").unwrap();
        // "a" appears in Alpha, Bravo, Charlie, Delta.
        let err = engine.want("alice", "a").unwrap_err();
        match err {
            CommandError::AmbiguousQuery { matches, .. } => {
                assert_eq!(matches.len(), 4);
            }
            other => panic!("expected AmbiguousQuery, got {other:?}"),
        }
    }

    #[test]
    fn want_allows_duplicates_in_one_list() {
        let mut engine = test_engine(2);
        engine.register("alice", "Alice", "Mudcats").unwrap();
        engine.want("alice", "alpha").unwrap();
        let list = engine.want("alice", "alpha").unwrap();
        assert_eq!(list, vec!["Alpha", "Alpha"]);
    }

    #[test]
    fn want_list_full_rejected_without_mutation() {
        let mut engine = test_engine(2);
        engine.register("alice", "Alice", "Mudcats").unwrap();
        for _ in 0..WANTLIST_MAX_LENGTH {
            engine.want("alice", "alpha").unwrap();
        }
        let err = engine.want("alice", "bravo").unwrap_err();
        assert!(matches!(err, CommandError::WantListFull(_)));
        assert_eq!(
            engine.participant("alice").unwrap().want_list.len(),
            WANTLIST_MAX_LENGTH
        );
    }

    #[test]
    fn want_unregistered_rejected() {
        let mut engine = test_engine(2);
        let err = engine.want("ghost", "alpha").unwrap_err();
        assert!(matches!(err, CommandError::NotRegistered));
    }

    #[test]
    fn want_taken_item_rejected() {
        let mut engine = test_engine(1);
        engine.register("p1", "P1", "Solo").unwrap();
        engine.register("p2", "P2", "Duo").unwrap();
        engine.start_draft().unwrap();

        let first = engine.pick_order()[0].clone();
        engine.want(&first, "alpha").unwrap();
        assert!(matches!(engine.tick(), Ok(TickOutcome::Picked { .. })));

        let second = engine.pick_order()[1].clone();
        let err = engine.want(&second, "alpha").unwrap_err();
        assert!(matches!(err, CommandError::ItemAlreadyTaken(_)));
    }

    #[test]
    fn clear_empties_unconditionally() {
        let mut engine = test_engine(2);
        engine.register("alice", "Alice", "Mudcats").unwrap();
        engine.want("alice", "alpha").unwrap();
        engine.want("alice", "bravo").unwrap();
        engine.clear_want_list("alice").unwrap();
        assert!(engine.participant("alice").unwrap().want_list.is_empty());

        let err = engine.clear_want_list("ghost").unwrap_err();
        assert!(matches!(err, CommandError::NotRegistered));
    }

    #[test]
    fn search_is_a_pure_read() {
        let engine = test_engine(2);
        assert_eq!(engine.search("br"), vec!["Bravo"]);
        assert_eq!(engine.search("br"), vec!["Bravo"]);
        assert!(engine.search("zzz").is_empty());
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    #[test]
    fn tick_is_idle_before_start() {
        let mut engine = test_engine(2);
        assert_eq!(engine.tick().unwrap(), TickOutcome::Idle);
    }

    #[test]
    fn tick_waits_and_notifies_once() {
        let (mut engine, order) = started_engine(2);
        let first = order[0].clone();

        match engine.tick().unwrap() {
            TickOutcome::Waiting {
                drafter,
                first_notice,
                round,
                pick_in_round,
            } => {
                assert_eq!(drafter, first);
                assert!(first_notice);
                assert_eq!(round, 0);
                assert_eq!(pick_in_round, 1);
            }
            other => panic!("expected Waiting, got {other:?}"),
        }

        // Subsequent empty ticks stay quiet.
        match engine.tick().unwrap() {
            TickOutcome::Waiting { first_notice, .. } => assert!(!first_notice),
            other => panic!("expected Waiting, got {other:?}"),
        }
    }

    #[test]
    fn waiting_latch_rearms_after_a_pick() {
        let (mut engine, order) = started_engine(2);
        let first = order[0].clone();

        assert!(matches!(
            engine.tick().unwrap(),
            TickOutcome::Waiting { first_notice: true, .. }
        ));
        engine.want(&first, "alpha").unwrap();
        assert!(matches!(engine.tick().unwrap(), TickOutcome::Picked { .. }));

        // New turn-holder gets their own first notice.
        match engine.tick().unwrap() {
            TickOutcome::Waiting {
                drafter,
                first_notice,
                ..
            } => {
                assert_eq!(drafter, order[1]);
                assert!(first_notice);
            }
            other => panic!("expected Waiting, got {other:?}"),
        }
    }

    #[test]
    fn pick_commits_head_and_purges_every_want_list() {
        let (mut engine, order) = started_engine(2);
        let (first, second) = (order[0].clone(), order[1].clone());

        engine.want(&first, "alpha").unwrap();
        engine.want(&second, "alpha").unwrap();
        engine.want(&second, "alpha").unwrap();
        engine.want(&second, "bravo").unwrap();

        match engine.tick().unwrap() {
            TickOutcome::Picked {
                drafter, item_name, ..
            } => {
                assert_eq!(drafter, first);
                assert_eq!(item_name, "Alpha");
            }
            other => panic!("expected Picked, got {other:?}"),
        }

        // Every occurrence of alpha is gone, bravo survives.
        assert!(engine.participant(&first).unwrap().want_list.is_empty());
        assert_eq!(engine.participant(&second).unwrap().want_list, vec!["bravo"]);
        assert_eq!(
            engine.participant(&first).unwrap().drafted_items,
            vec!["alpha"]
        );
        engine.check_consistency().unwrap();
    }

    #[test]
    fn snake_scenario_three_participants_two_rounds() {
        // Deterministic order: single-participant registrations are shuffled,
        // so drive by whatever order start chose.
        let (mut engine, order) = started_engine(2);
        let queue = [
            (order[0].clone(), "alpha"),
            (order[1].clone(), "bravo"),
            (order[2].clone(), "charlie"),
        ];
        for (who, what) in &queue {
            engine.want(who, what).unwrap();
        }

        for (expected, _) in &queue {
            match engine.tick().unwrap() {
                TickOutcome::Picked { drafter, round, .. } => {
                    assert_eq!(&drafter, expected);
                    assert_eq!(round, 0);
                }
                other => panic!("expected Picked, got {other:?}"),
            }
        }

        // Round 1 snakes backward: the last picker goes again.
        assert_eq!(engine.status().round, 2);
        engine.want(&order[2], "delta").unwrap();
        match engine.tick().unwrap() {
            TickOutcome::Picked {
                drafter,
                round,
                pick_in_round,
                ..
            } => {
                assert_eq!(drafter, order[2]);
                assert_eq!(round, 1);
                assert_eq!(pick_in_round, 1);
            }
            other => panic!("expected Picked, got {other:?}"),
        }
        engine.check_consistency().unwrap();
    }

    #[test]
    fn draft_finishes_exactly_at_rounds_times_players() {
        let mut engine = test_engine(2);
        engine.register("p1", "P1", "One").unwrap();
        engine.register("p2", "P2", "Two").unwrap();
        engine.start_draft().unwrap();

        let wants = ["alpha", "bravo", "charlie", "delta"];
        let mut committed = 0;
        for want in wants {
            let drafter = engine
                .status()
                .current_team
                .expect("draft should still be running");
            let id = engine
                .pick_order()
                .iter()
                .find(|pid| {
                    engine.participant(pid).map(|p| p.team_name.clone()) == Some(drafter.clone())
                })
                .unwrap()
                .clone();
            engine.want(&id, want).unwrap();
            assert!(matches!(engine.tick().unwrap(), TickOutcome::Picked { .. }));
            committed += 1;
        }
        assert_eq!(committed, 4);
        assert_eq!(engine.status().phase, DraftPhase::Finished);
        assert_eq!(engine.tick().unwrap(), TickOutcome::Finished);
        engine.check_consistency().unwrap();
    }

    #[test]
    fn want_after_finish_rejected() {
        let mut engine = test_engine(1);
        engine.register("p1", "P1", "Solo").unwrap();
        engine.start_draft().unwrap();
        engine.want("p1", "alpha").unwrap();
        engine.tick().unwrap();

        let err = engine.want("p1", "bravo").unwrap_err();
        assert!(matches!(err, CommandError::DraftFinished));
        // Clear is still allowed.
        engine.clear_want_list("p1").unwrap();
    }

    // -----------------------------------------------------------------------
    // Consistency
    // -----------------------------------------------------------------------

    #[test]
    fn consistency_audit_catches_taken_item_in_want_list() {
        let (mut engine, order) = started_engine(2);
        let first = order[0].clone();
        engine.want(&first, "alpha").unwrap();
        engine.tick().unwrap();

        // Corrupt the registry behind the engine's back. Pick 1 of round 0
        // belongs to order[1], so the taken item lands at their head.
        engine
            .registry
            .get_mut(&order[1])
            .unwrap()
            .want_list
            .push("alpha".to_string());
        assert!(engine.check_consistency().is_err());

        // The corrupted head is also caught live by the next tick.
        assert!(matches!(engine.tick(), Err(TickError::Consistency(_))));
    }

    #[test]
    fn status_reports_phase_round_and_drafter() {
        let mut engine = test_engine(2);
        let status = engine.status();
        assert_eq!(status.phase, DraftPhase::NotStarted);
        assert_eq!(status.round, 0);
        assert!(status.current_team.is_none());

        engine.register("p1", "P1", "One").unwrap();
        engine.start_draft().unwrap();
        let status = engine.status();
        assert_eq!(status.phase, DraftPhase::InProgress);
        assert_eq!(status.round, 1);
        assert_eq!(status.pick_in_round, 1);
        assert_eq!(status.current_team.as_deref(), Some("One"));
        assert_eq!(status.total_picks, 2);
    }

    // -----------------------------------------------------------------------
    // Persistence / resume
    // -----------------------------------------------------------------------

    #[test]
    fn first_init_refuses_initialized_database() {
        let db = Database::open(":memory:").unwrap();
        db.initialize(
            ItemCatalog::from_names(ITEMS).items(),
            &DraftRecord::new(2),
            "draft_seeded",
        )
        .unwrap();
        let err = DraftEngine::first_init(&test_config(2), db, ITEMS).unwrap_err();
        assert!(err.to_string().contains("refusing"));
    }

    #[test]
    fn first_init_rejects_empty_item_list() {
        let db = Database::open(":memory:").unwrap();
        let err =
            DraftEngine::first_init(&test_config(2), db, Vec::<String>::new()).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }
}
