//! Tick Resolution
//!
//! One call per scheduler tick. Given the commands drained from the queue
//! (in arrival order) and the locked world state:
//!
//! 1. keep only the last command each player sent this tick,
//! 2. order players by the arrival index of that last command,
//! 3. walk them in that order against an occupancy map of current cells,
//!    rejecting any move into a cell held by someone else,
//! 4. pick up at most one collectible per accepted move,
//! 5. end the round when the last collectible is taken.
//!
//! Priority by arrival order of the final command is the tie-break for two
//! players racing into the same cell.

use std::collections::BTreeMap;

use tracing::debug;

use crate::game::collision::OccupancyMap;
use crate::game::events::GameEvent;
use crate::game::input::{Command, MoveAction};
use crate::game::state::{PlayerId, WorldSnapshot, WorldState};
use crate::game::sweet::collect_sweet;

/// Result of a tick.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Tick number that was resolved
    pub tick: u64,
    /// Events generated this tick, in the order they happened
    pub events: Vec<GameEvent>,
    /// Moves applied
    pub moves_applied: usize,
    /// Moves rejected because the destination was taken
    pub moves_blocked: usize,
    /// Whether the round ended this tick
    pub round_over: bool,
}

/// One command per player, ordered by the arrival index of each player's
/// last command.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MovePlan {
    moves: Vec<(PlayerId, MoveAction)>,
}

impl MovePlan {
    /// Reduce a tick's worth of commands (arrival order) to a plan.
    pub fn from_commands(commands: Vec<Command>) -> Self {
        let mut last: BTreeMap<PlayerId, (usize, MoveAction)> = BTreeMap::new();
        for (idx, command) in commands.into_iter().enumerate() {
            last.insert(command.player_id, (idx, command.action));
        }

        let mut ordered: Vec<(usize, PlayerId, MoveAction)> = last
            .into_iter()
            .map(|(id, (idx, action))| (idx, id, action))
            .collect();
        ordered.sort_by_key(|(idx, _, _)| *idx);

        Self {
            moves: ordered.into_iter().map(|(_, id, action)| (id, action)).collect(),
        }
    }

    /// Moves in priority order.
    pub fn moves(&self) -> &[(PlayerId, MoveAction)] {
        &self.moves
    }

    /// Number of players moving.
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    /// True when nobody moves this tick.
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }
}

/// Run one simulation tick against the world state.
///
/// Advances the tick counter even when the plan is empty.
pub fn resolve_tick(state: &mut WorldState, plan: &MovePlan) -> TickResult {
    state.tick += 1;

    let mut result = TickResult {
        tick: state.tick,
        ..Default::default()
    };

    if state.round_over {
        return result;
    }

    let mut occupancy = OccupancyMap::from_players(state.players.values());
    let mut collected_any = false;

    for (player_id, action) in plan.moves() {
        // Player may have left after queueing
        let Some(from) = state.players.get(player_id).map(|p| p.cell()) else {
            continue;
        };

        let to = action.destination(from, state.size);
        if occupancy.is_blocked_for(to, player_id) {
            result.moves_blocked += 1;
            continue;
        }

        occupancy.relocate(player_id, from, to);
        if let Some(player) = state.players.get_mut(player_id) {
            player.set_cell(to);
        }
        result.moves_applied += 1;

        if let Some(event) = collect_sweet(state, player_id) {
            debug!("Tick {}: {} collected a sweet", state.tick, player_id);
            collected_any = true;
            result.events.push(event);
        }
    }

    if collected_any && state.sweets.is_empty() {
        state.round_over = true;
        result.round_over = true;
        result.events.push(GameEvent::round_over(state.tick, state.final_scores()));
    }

    result
}

/// Resolve a tick and copy the resulting board in the same critical section.
pub fn resolve_and_snapshot(state: &mut WorldState, plan: &MovePlan) -> (TickResult, WorldSnapshot) {
    let result = resolve_tick(state, plan);
    (result, state.snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::grid::{Cell, Direction, GridSize};
    use crate::core::rng::DeterministicRng;
    use crate::game::events::GameEventData;
    use crate::game::state::{Player, SweetId};
    use proptest::prelude::*;

    fn pid(s: &str) -> PlayerId {
        PlayerId::new(s)
    }

    fn board(w: i32, h: i32, players: &[(&str, i32, i32)]) -> WorldState {
        let mut state = WorldState::new(GridSize::new(w, h), DeterministicRng::new(12345));
        for (id, x, y) in players {
            state
                .players
                .insert(pid(id), Player::new(pid(id), *id, Cell::new(*x, *y)));
        }
        state
    }

    fn run(state: &mut WorldState, commands: Vec<Command>) -> TickResult {
        resolve_tick(state, &MovePlan::from_commands(commands))
    }

    fn cell_of(state: &WorldState, id: &str) -> Cell {
        state.players[&pid(id)].cell()
    }

    #[test]
    fn test_plan_keeps_last_command_per_player() {
        let plan = MovePlan::from_commands(vec![
            Command::step(pid("p-1"), Direction::Up),
            Command::step(pid("p-2"), Direction::Left),
            Command::step(pid("p-1"), Direction::Down),
        ]);

        assert_eq!(
            plan.moves(),
            &[
                (pid("p-2"), MoveAction::Step(Direction::Left)),
                (pid("p-1"), MoveAction::Step(Direction::Down)),
            ]
        );
    }

    #[test]
    fn test_empty_tick_advances_counter_only() {
        let mut state = board(3, 3, &[("p-1", 0, 0)]);
        state.set_sweet(SweetId::new("s1"), Cell::new(2, 2));
        let before = state.snapshot();

        for expected in 1..=5 {
            let result = run(&mut state, vec![]);
            assert_eq!(result.tick, expected);
            assert!(result.events.is_empty());
        }

        let after = state.snapshot();
        assert_eq!(after.tick, before.tick + 5);
        assert_eq!(after.players, before.players);
        assert_eq!(after.sweets, before.sweets);
    }

    #[test]
    fn test_move_into_occupied_cell_is_blocked() {
        let mut state = board(3, 3, &[("p-1", 1, 1), ("p-2", 2, 1)]);

        let result = run(&mut state, vec![Command::step(pid("p-1"), Direction::Right)]);

        assert_eq!(cell_of(&state, "p-1"), Cell::new(1, 1));
        assert_eq!(cell_of(&state, "p-2"), Cell::new(2, 1));
        assert_eq!(result.moves_blocked, 1);
        assert_eq!(result.moves_applied, 0);
    }

    #[test]
    fn test_collect_sweet_on_move() {
        let mut state = board(3, 3, &[("p-1", 0, 0)]);
        state.set_sweet(SweetId::new("s1"), Cell::new(1, 0));
        state.set_sweet(SweetId::new("s2"), Cell::new(2, 2));

        let result = run(&mut state, vec![Command::step(pid("p-1"), Direction::Right)]);

        assert_eq!(cell_of(&state, "p-1"), Cell::new(1, 0));
        assert_eq!(state.players[&pid("p-1")].score, 1);
        assert_eq!(state.sweets_count(), 1);
        assert_eq!(result.events.len(), 1);
        assert!(!result.round_over);
    }

    #[test]
    fn test_conflict_first_arrival_wins() {
        let mut state = board(3, 3, &[("p-1", 0, 1), ("p-2", 2, 1)]);
        state.set_sweet(SweetId::new("s1"), Cell::new(1, 1));

        run(
            &mut state,
            vec![
                Command::step(pid("p-1"), Direction::Right),
                Command::step(pid("p-2"), Direction::Left),
            ],
        );

        assert_eq!(cell_of(&state, "p-1"), Cell::new(1, 1));
        assert_eq!(state.players[&pid("p-1")].score, 1);
        assert_eq!(cell_of(&state, "p-2"), Cell::new(2, 1));
        assert_eq!(state.players[&pid("p-2")].score, 0);
        assert_eq!(state.sweets_count(), 0);
    }

    #[test]
    fn test_conflict_reversed_arrival_order() {
        let mut state = board(3, 3, &[("p-1", 0, 1), ("p-2", 2, 1)]);
        state.set_sweet(SweetId::new("s1"), Cell::new(1, 1));

        run(
            &mut state,
            vec![
                Command::step(pid("p-2"), Direction::Left),
                Command::step(pid("p-1"), Direction::Right),
            ],
        );

        assert_eq!(cell_of(&state, "p-2"), Cell::new(1, 1));
        assert_eq!(state.players[&pid("p-2")].score, 1);
        assert_eq!(cell_of(&state, "p-1"), Cell::new(0, 1));
        assert_eq!(state.players[&pid("p-1")].score, 0);
        assert_eq!(state.sweets_count(), 0);
    }

    #[test]
    fn test_priority_uses_last_command_arrival() {
        // p-1 speaks first but re-sends after p-2, so p-2 takes priority
        let mut state = board(3, 3, &[("p-1", 0, 1), ("p-2", 2, 1)]);

        run(
            &mut state,
            vec![
                Command::step(pid("p-1"), Direction::Up),
                Command::step(pid("p-2"), Direction::Left),
                Command::step(pid("p-1"), Direction::Right),
            ],
        );

        assert_eq!(cell_of(&state, "p-2"), Cell::new(1, 1));
        assert_eq!(cell_of(&state, "p-1"), Cell::new(0, 1));
    }

    #[test]
    fn test_vacated_cell_can_be_taken_later_in_order() {
        let mut state = board(3, 1, &[("p-1", 1, 0), ("p-2", 0, 0)]);

        run(
            &mut state,
            vec![
                Command::step(pid("p-1"), Direction::Right),
                Command::step(pid("p-2"), Direction::Right),
            ],
        );

        assert_eq!(cell_of(&state, "p-1"), Cell::new(2, 0));
        assert_eq!(cell_of(&state, "p-2"), Cell::new(1, 0));
    }

    #[test]
    fn test_absolute_target_clamped() {
        let mut state = board(4, 4, &[("p-1", 0, 0)]);

        run(&mut state, vec![Command::goto(pid("p-1"), 50, -3)]);

        assert_eq!(cell_of(&state, "p-1"), Cell::new(3, 0));
    }

    #[test]
    fn test_unknown_player_ignored() {
        let mut state = board(3, 3, &[("p-1", 0, 0)]);

        let result = run(&mut state, vec![Command::step(pid("ghost"), Direction::Down)]);

        assert_eq!(result.moves_applied, 0);
        assert_eq!(result.moves_blocked, 0);
    }

    #[test]
    fn test_round_over_emitted_once() {
        let mut state = board(3, 3, &[("p-1", 0, 0), ("p-2", 2, 2)]);
        state.set_sweet(SweetId::new("s1"), Cell::new(1, 0));

        let result = run(&mut state, vec![Command::step(pid("p-1"), Direction::Right)]);

        assert!(result.round_over);
        assert!(state.round_over);
        let last = result.events.last().unwrap();
        match &last.data {
            GameEventData::RoundOver { scores } => {
                assert_eq!(scores.len(), 2);
                assert_eq!(scores[0].id, pid("p-1"));
                assert_eq!(scores[0].score, 1);
                assert_eq!(scores[1].score, 0);
            }
            other => panic!("unexpected event {:?}", other),
        }

        // No second game over, no further motion
        let next = run(&mut state, vec![Command::step(pid("p-2"), Direction::Up)]);
        assert!(!next.round_over);
        assert!(next.events.is_empty());
        assert_eq!(cell_of(&state, "p-2"), Cell::new(2, 2));
    }

    #[test]
    fn test_zero_sweet_round_does_not_end() {
        let mut state = board(3, 3, &[("p-1", 0, 0)]);

        let result = run(&mut state, vec![Command::step(pid("p-1"), Direction::Down)]);

        assert!(!result.round_over);
        assert!(!state.round_over);
    }

    fn arb_command(players: usize) -> impl Strategy<Value = Command> {
        let dir = prop_oneof![
            Just(Direction::Up),
            Just(Direction::Down),
            Just(Direction::Left),
            Just(Direction::Right),
        ];
        let action = prop_oneof![
            dir.prop_map(MoveAction::Step),
            (-3i64..12, -3i64..12).prop_map(|(x, y)| MoveAction::Goto { x, y }),
        ];
        (0..players, action).prop_map(|(p, action)| Command {
            player_id: PlayerId::from_seq(p as u64 + 1),
            action,
        })
    }

    proptest! {
        #[test]
        fn prop_bounds_and_no_overlap(
            seed in any::<u64>(),
            ticks in prop::collection::vec(prop::collection::vec(arb_command(6), 0..30), 1..12),
        ) {
            let size = GridSize::new(6, 5);
            let mut state = WorldState::with_sweets(size, DeterministicRng::new(seed), 5);
            for i in 0..6 {
                state.add_player(&format!("P{}", i)).unwrap();
            }

            let mut collected = std::collections::BTreeSet::new();
            for commands in ticks {
                let before: BTreeMap<PlayerId, Cell> = state
                    .players
                    .values()
                    .map(|p| (p.id.clone(), p.cell()))
                    .collect();
                let sweets_before = state.sweets_count();

                let result = run(&mut state, commands);

                let mut cells = std::collections::BTreeSet::new();
                for player in state.players.values() {
                    prop_assert!(size.contains(player.cell()));
                    prop_assert!(cells.insert(player.cell()));
                }

                // At most one accepted move per player per tick
                prop_assert!(result.moves_applied <= before.len());
                prop_assert!(state.sweets_count() <= sweets_before);

                for event in &result.events {
                    if let GameEventData::SweetCollected { sweet_id, .. } = &event.data {
                        prop_assert!(collected.insert(sweet_id.clone()));
                    }
                }
            }
        }
    }
}
