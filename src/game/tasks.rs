//! Task Progress
//!
//! Per-player task lists and the global completion percentage.
//!
//! Each player draws a bounded number of tasks from the catalog subset matching
//! their role, exclusive of tasks already drawn by someone else. Impostors get
//! sabotage-kind cover tasks that never count toward progress.

use std::collections::{BTreeMap, VecDeque};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Serialize, Deserialize};

use crate::core::catalog::{TaskCatalog, TaskKind};
use crate::core::id::{PlayerId, TaskId};
use crate::game::error::GameError;
use crate::game::state::{Role, Roster};

/// Shuffled draw piles, one per task kind.
#[derive(Debug, Clone)]
pub struct TaskPools {
    normal: VecDeque<TaskId>,
    sabotage: VecDeque<TaskId>,
}

impl TaskPools {
    /// Shuffle each kind of the catalog into its own pile.
    pub fn shuffled<R: Rng + ?Sized>(catalog: &TaskCatalog, rng: &mut R) -> Self {
        let mut normal: Vec<TaskId> = catalog.of_kind(TaskKind::Normal).map(|t| t.id).collect();
        let mut sabotage: Vec<TaskId> = catalog.of_kind(TaskKind::Sabotage).map(|t| t.id).collect();
        normal.shuffle(rng);
        sabotage.shuffle(rng);

        Self {
            normal: normal.into(),
            sabotage: sabotage.into(),
        }
    }

    fn pile_for(&mut self, role: Role) -> &mut VecDeque<TaskId> {
        match role {
            Role::Crewmate => &mut self.normal,
            Role::Impostor => &mut self.sabotage,
        }
    }

    /// Take up to `count` tasks for a role. Fewer are returned once the pile runs dry.
    pub fn draw(&mut self, role: Role, count: usize) -> Vec<TaskId> {
        let pile = self.pile_for(role);
        let take = count.min(pile.len());
        pile.drain(..take).collect()
    }
}

/// One task on a player's list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatus {
    /// Catalog id.
    pub id: TaskId,
    /// Display title.
    pub title: String,
    /// Completed.
    pub done: bool,
}

/// Task completion for every player in the round.
#[derive(Clone, Debug)]
pub struct TaskBoard {
    entries: BTreeMap<PlayerId, BTreeMap<TaskId, bool>>,
    tasks_per_player: usize,
}

impl TaskBoard {
    /// Create an empty board.
    pub fn new(tasks_per_player: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            tasks_per_player,
        }
    }

    /// Populate one player's list from the piles, all incomplete.
    pub fn init_tasks(&mut self, player_id: PlayerId, role: Role, pools: &mut TaskPools) {
        let drawn = pools.draw(role, self.tasks_per_player);
        self.entries.insert(player_id, drawn.into_iter().map(|id| (id, false)).collect());
    }

    /// Set one task's completion flag.
    pub fn set(&mut self, player_id: &PlayerId, task_id: TaskId, done: bool) -> Result<(), GameError> {
        let tasks = self.entries.get_mut(player_id).ok_or(GameError::UnknownPlayer)?;
        let entry = tasks
            .get_mut(&task_id)
            .ok_or_else(|| GameError::validation(format!("task {} is not assigned to this player", task_id)))?;
        *entry = done;
        Ok(())
    }

    /// A player's list with titles, in task id order.
    pub fn tasks_of(&self, player_id: &PlayerId, catalog: &TaskCatalog) -> Vec<TaskStatus> {
        self.entries
            .get(player_id)
            .map(|tasks| {
                tasks
                    .iter()
                    .map(|(id, done)| TaskStatus {
                        id: *id,
                        title: catalog.get(*id).map(|t| t.title.clone()).unwrap_or_default(),
                        done: *done,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Global completion percentage in `0..=100`.
    ///
    /// Every crewmate dealt into the round holds a full share of the total,
    /// ghosts included. Only alive crewmates add to the done count, so losing
    /// a crewmate can lower progress but never raise it. Rounded half up.
    pub fn global_progress(&self, roster: &Roster) -> u8 {
        let mut done = 0usize;
        let mut crewmates = 0usize;

        for (player_id, tasks) in &self.entries {
            let Some(player) = roster.get(player_id) else {
                continue;
            };
            if !player.is_crewmate() {
                continue;
            }
            crewmates += 1;
            if player.alive {
                done += tasks.values().filter(|d| **d).count();
            }
        }

        let assigned = crewmates * self.tasks_per_player;
        if assigned == 0 {
            return 0;
        }

        let percent = (200 * done + assigned) / (2 * assigned);
        percent.min(100) as u8
    }

    /// Forget a player's tasks.
    pub fn remove_player(&mut self, player_id: &PlayerId) {
        self.entries.remove(player_id);
    }

    /// Drop every list.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use crate::game::state::Player;

    fn pid(n: u8) -> PlayerId {
        PlayerId::from_bytes([n; 16])
    }

    /// Roster with player 1 as impostor and 2..=n as crewmates, each with 5 tasks.
    fn setup(n: u8) -> (Roster, TaskBoard, TaskCatalog) {
        let catalog = TaskCatalog::default();
        let mut pools = TaskPools::shuffled(&catalog, &mut StdRng::seed_from_u64(3));
        let mut roster = Roster::new();
        let mut board = TaskBoard::new(5);

        for i in 1..=n {
            let role = if i == 1 { Role::Impostor } else { Role::Crewmate };
            let mut player = Player::new(pid(i), format!("p{}", i));
            player.role = Some(role);
            roster.insert(player);
            board.init_tasks(pid(i), role, &mut pools);
        }

        (roster, board, catalog)
    }

    fn ids_of(board: &TaskBoard, player: u8, catalog: &TaskCatalog) -> Vec<TaskId> {
        board.tasks_of(&pid(player), catalog).into_iter().map(|t| t.id).collect()
    }

    #[test]
    fn test_draws_match_role_and_are_exclusive() {
        let (_, board, catalog) = setup(3);

        let impostor_tasks = ids_of(&board, 1, &catalog);
        assert_eq!(impostor_tasks.len(), 5);
        assert!(impostor_tasks
            .iter()
            .all(|id| catalog.get(*id).unwrap().kind == TaskKind::Sabotage));

        let mut all = BTreeSet::new();
        for p in 2..=3 {
            for id in ids_of(&board, p, &catalog) {
                assert_eq!(catalog.get(id).unwrap().kind, TaskKind::Normal);
                assert!(all.insert(id), "task {} drawn twice", id);
            }
        }
        assert_eq!(all.len(), 10);
    }

    #[test]
    fn test_full_lobby_fills_every_hand() {
        let (_, board, catalog) = setup(13);
        let mut all = BTreeSet::new();
        for p in 1..=13 {
            let ids = ids_of(&board, p, &catalog);
            assert_eq!(ids.len(), 5, "player {} was short-dealt", p);
            all.extend(ids);
        }
        assert_eq!(all.len(), 65);
    }

    #[test]
    fn test_dry_pile_gives_fewer_tasks() {
        let catalog = TaskCatalog::from_json(r#"[
            {"id": 1, "title": "A", "kind": "normal"},
            {"id": 2, "title": "B", "kind": "normal"},
            {"id": 3, "title": "C", "kind": "sabotage"}
        ]"#).unwrap();
        let mut pools = TaskPools::shuffled(&catalog, &mut StdRng::seed_from_u64(3));

        assert_eq!(pools.draw(Role::Crewmate, 5).len(), 2);
        assert!(pools.draw(Role::Crewmate, 5).is_empty());
        assert_eq!(pools.draw(Role::Impostor, 5), vec![TaskId(3)]);
    }

    #[test]
    fn test_progress_starts_at_zero() {
        let (roster, board, _) = setup(4);
        assert_eq!(board.global_progress(&roster), 0);
    }

    #[test]
    fn test_progress_counts_crewmates_only() {
        let (roster, mut board, catalog) = setup(3);

        // Impostor completes all cover tasks: no effect
        for id in ids_of(&board, 1, &catalog) {
            board.set(&pid(1), id, true).unwrap();
        }
        assert_eq!(board.global_progress(&roster), 0);

        // One of ten crew tasks
        let crew_task = ids_of(&board, 2, &catalog)[0];
        board.set(&pid(2), crew_task, true).unwrap();
        assert_eq!(board.global_progress(&roster), 10);

        // Unmarking goes back down
        board.set(&pid(2), crew_task, false).unwrap();
        assert_eq!(board.global_progress(&roster), 0);
    }

    #[test]
    fn test_progress_rounds_half_up_and_reaches_hundred() {
        let (roster, mut board, catalog) = setup(3);
        let tasks2 = ids_of(&board, 2, &catalog);
        let tasks3 = ids_of(&board, 3, &catalog);

        for id in &tasks2 {
            board.set(&pid(2), *id, true).unwrap();
        }
        assert_eq!(board.global_progress(&roster), 50);

        for id in &tasks3 {
            board.set(&pid(3), *id, true).unwrap();
        }
        assert_eq!(board.global_progress(&roster), 100);
    }

    #[test]
    fn test_ghost_crewmates_stay_in_the_total() {
        let (mut roster, mut board, catalog) = setup(3);
        for id in ids_of(&board, 2, &catalog) {
            board.set(&pid(2), id, true).unwrap();
        }
        assert_eq!(board.global_progress(&roster), 50);

        // Losing the idle crewmate leaves progress where it was
        roster.get_mut(&pid(3)).unwrap().alive = false;
        assert_eq!(board.global_progress(&roster), 50);

        // Losing the busy one drops their work from the count
        roster.get_mut(&pid(2)).unwrap().alive = false;
        assert_eq!(board.global_progress(&roster), 0);
    }

    #[test]
    fn test_losing_a_crewmate_never_raises_progress() {
        let (mut roster, mut board, catalog) = setup(5);
        for p in 2..=4 {
            for id in ids_of(&board, p, &catalog) {
                board.set(&pid(p), id, true).unwrap();
            }
        }
        let mut before = board.global_progress(&roster);
        assert_eq!(before, 75);

        for p in (2..=5).rev() {
            roster.get_mut(&pid(p)).unwrap().alive = false;
            let after = board.global_progress(&roster);
            assert!(after <= before, "progress rose from {} to {}", before, after);
            before = after;
        }
        assert_eq!(before, 0);
    }

    #[test]
    fn test_set_rejects_unknown_task_and_player() {
        let (_, mut board, _) = setup(2);
        assert_eq!(board.set(&pid(9), TaskId(1), true), Err(GameError::UnknownPlayer));
        assert!(matches!(board.set(&pid(2), TaskId(999), true), Err(GameError::Validation(_))));
    }

    #[test]
    fn test_titles_come_from_catalog() {
        let (_, board, catalog) = setup(2);
        for status in board.tasks_of(&pid(2), &catalog) {
            assert_eq!(status.title, catalog.get(status.id).unwrap().title);
            assert!(!status.done);
        }
        assert!(board.tasks_of(&pid(9), &catalog).is_empty());
    }
}
