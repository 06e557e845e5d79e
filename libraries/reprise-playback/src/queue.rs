//! Queue session
//!
//! In-memory traversal state for the active playlist:
//!
//! ```text
//! data:   [T0] [T1] [T2] [T3] [T4]      arena, ordered by position
//!                ^ current
//! stack:  T3 -> T0 -> T1                shuffle history of this cycle
//!                      ^ cursor
//! pool:   {T4, T2}                      not yet visited, pre-shuffled
//! ```
//!
//! Stack and pool hold ids into the arena. Every change to a track's
//! `position` or `position_in_stack` is queued as a [`PendingWrite`] for the
//! owner to flush to the track store.

use crate::shuffle::{insert_random, refresh_pool};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use reprise_core::{PlaylistId, Track, TrackId};
use std::collections::{HashMap, HashSet};

/// A store write produced by a queue operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingWrite {
    /// Clear every stack slot of the playlist
    ClearStack,

    /// Assign (or clear) one row's stack slot
    StackSlot {
        track_id: TrackId,
        slot: Option<u32>,
    },

    /// Move one row to a new playlist position
    Position { track_id: TrackId, position: u32 },
}

/// Traversal state for one open playlist
#[derive(Debug)]
pub struct QueueSession {
    playlist_id: PlaylistId,
    data: Vec<Track>,
    index: HashMap<TrackId, usize>,
    current: Option<usize>,
    shuffle_enabled: bool,
    stack: Vec<TrackId>,
    stack_cursor: Option<usize>,
    pool: Vec<TrackId>,
    pending: Vec<PendingWrite>,
    rng: StdRng,
}

impl QueueSession {
    /// Open a playlist positioned at `start_index` (clamped to the last track)
    ///
    /// In shuffle mode the persisted history is reloaded from the rows' stack
    /// slots and the starting track is moved to its top.
    pub fn open(
        playlist_id: PlaylistId,
        rows: Vec<Track>,
        start_index: usize,
        shuffle_enabled: bool,
        rng: StdRng,
    ) -> Self {
        let mut session = Self {
            playlist_id,
            data: Vec::new(),
            index: HashMap::new(),
            current: None,
            shuffle_enabled,
            stack: Vec::new(),
            stack_cursor: None,
            pool: Vec::new(),
            pending: Vec::new(),
            rng,
        };

        session.load_rows(rows);
        if !session.data.is_empty() {
            session.current = Some(start_index.min(session.data.len() - 1));
        }
        if shuffle_enabled {
            session.restore_history();
        }

        session.check_invariants();
        session
    }

    // ===== Accessors =====

    pub fn playlist_id(&self) -> PlaylistId {
        self.playlist_id
    }

    pub fn tracks(&self) -> &[Track] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn shuffle_enabled(&self) -> bool {
        self.shuffle_enabled
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// Shuffle history, oldest first
    pub fn stack(&self) -> &[TrackId] {
        &self.stack
    }

    pub fn stack_cursor(&self) -> Option<usize> {
        self.stack_cursor
    }

    /// Unvisited tracks of the current cycle, in draw order
    pub fn pool(&self) -> &[TrackId] {
        &self.pool
    }

    /// Current track without seeding the shuffle history
    pub fn peek_current(&self) -> Option<&Track> {
        self.current.and_then(|i| self.data.get(i))
    }

    pub fn contains(&self, track_id: &TrackId) -> bool {
        self.index.contains_key(track_id)
    }

    pub fn index_of(&self, track_id: &TrackId) -> Option<usize> {
        self.index.get(track_id).copied()
    }

    /// Drain the store writes queued since the last call
    pub fn take_pending_writes(&mut self) -> Vec<PendingWrite> {
        std::mem::take(&mut self.pending)
    }

    /// Put back writes that could not be flushed, ahead of newer ones
    pub fn requeue_writes(&mut self, mut writes: Vec<PendingWrite>) {
        writes.append(&mut self.pending);
        self.pending = writes;
    }

    // ===== Traversal =====

    /// Current track
    ///
    /// Seeds the shuffle history with it when shuffle is on and the history is empty.
    pub fn current(&mut self) -> Option<&Track> {
        let index = self.current?;
        if self.shuffle_enabled && self.stack.is_empty() {
            self.seed_stack();
        }
        self.data.get(index)
    }

    /// Advance to the next track
    ///
    /// Linear mode wraps around. Shuffle mode replays forward history when the
    /// cursor is below the top of the stack, otherwise draws from the pool,
    /// refreshing it first when the cycle is exhausted.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<&Track> {
        if self.data.is_empty() {
            return None;
        }

        if self.shuffle_enabled {
            self.next_shuffled();
        } else {
            let len = self.data.len();
            self.current = Some(self.current.map_or(0, |c| (c + 1) % len));
        }

        self.check_invariants();
        self.peek_current()
    }

    /// Step back to the previous track
    ///
    /// Linear mode wraps around. Shuffle mode walks back through the history
    /// and stops at its first entry; the pool is never touched.
    pub fn previous(&mut self) -> Option<&Track> {
        if self.data.is_empty() {
            return None;
        }

        if self.shuffle_enabled {
            self.seed_stack();
            self.stack_cursor = self.stack_cursor.map(|c| c.saturating_sub(1));
            self.sync_current_to_cursor();
        } else {
            let len = self.data.len();
            self.current = Some(self.current.map_or(0, |c| (c + len - 1) % len));
        }

        self.check_invariants();
        self.peek_current()
    }

    /// Whether the traversal sits on its last track
    ///
    /// In shuffle mode: the pool is empty and the cursor is at the top of the
    /// stack, so the next advance starts a new cycle. An empty queue is never ended.
    pub fn is_ended(&self) -> bool {
        let Some(current) = self.current else {
            return false;
        };

        if self.shuffle_enabled {
            let at_top = self
                .stack_cursor
                .map_or(true, |c| c + 1 == self.stack.len());
            self.pool.is_empty() && at_top
        } else {
            current + 1 == self.data.len()
        }
    }

    /// Jump to a track of this playlist
    pub fn select(&mut self, track_id: &TrackId) -> Option<&Track> {
        let index = self.index_of(track_id)?;
        self.current = Some(index);

        if self.shuffle_enabled {
            self.move_to_top(track_id);
            self.persist_stack();
        }

        self.check_invariants();
        self.data.get(index)
    }

    /// Turn shuffle traversal on or off
    ///
    /// Turning it on starts a fresh cycle from the current track, unless the
    /// history already consists of exactly that track. Turning it off leaves
    /// the history alone; it is not consulted until shuffle returns.
    pub fn set_shuffle(&mut self, enabled: bool) {
        if !enabled {
            self.shuffle_enabled = false;
            return;
        }

        let current_id = self.current_id();
        let degenerate = self.shuffle_enabled
            && self.stack.len() == 1
            && current_id.as_ref() == self.stack.first();

        self.shuffle_enabled = true;
        if !degenerate {
            self.stack = current_id.into_iter().collect();
            self.stack_cursor = if self.stack.is_empty() { None } else { Some(0) };
            self.rebuild_pool();
            self.persist_stack();
        }

        self.check_invariants();
    }

    /// Re-sync with the store after rows were inserted, deleted or reordered
    ///
    /// `rows` is the playlist as now stored. Positions are renumbered to
    /// `0..N`. If the current track is gone the cursor stays at the same
    /// place, clamped to the end. In shuffle mode `removed` ids leave the
    /// history and the pool, unknown ids join the pool, and the whole history
    /// is persisted again.
    pub fn reconcile(&mut self, rows: Vec<Track>, removed: &[TrackId]) {
        let previous_id = self.current_id();
        let previous_index = self.current;
        let previous_cursor = self.stack_cursor;

        self.load_rows(rows);

        if self.data.is_empty() {
            self.current = None;
            self.stack.clear();
            self.pool.clear();
            self.stack_cursor = None;
            return;
        }

        let last = self.data.len() - 1;
        let survivor = previous_id.as_ref().and_then(|id| self.index_of(id));
        self.current = Some(survivor.unwrap_or_else(|| previous_index.unwrap_or(0).min(last)));

        if self.shuffle_enabled {
            self.reconcile_history(removed, previous_cursor, survivor.is_some());
        }

        self.check_invariants();
    }

    // ===== Internals =====

    fn current_id(&self) -> Option<TrackId> {
        self.peek_current().map(|t| t.id.clone())
    }

    fn load_rows(&mut self, mut rows: Vec<Track>) {
        rows.sort_by_key(|t| t.position);

        for (i, track) in rows.iter_mut().enumerate() {
            let position = i as u32;
            if track.position != position {
                track.position = position;
                self.pending.push(PendingWrite::Position {
                    track_id: track.id.clone(),
                    position,
                });
            }
        }

        self.index = rows
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.clone(), i))
            .collect();
        self.data = rows;
    }

    fn restore_history(&mut self) {
        let mut history: Vec<(u32, TrackId)> = self
            .data
            .iter()
            .filter_map(|t| t.position_in_stack.map(|slot| (slot, t.id.clone())))
            .collect();
        history.sort_by_key(|(slot, _)| *slot);

        self.stack = history.into_iter().map(|(_, id)| id).collect();
        self.stack_cursor = self.stack.len().checked_sub(1);
        self.rebuild_pool();

        if let Some(id) = self.current_id() {
            self.move_to_top(&id);
        }
        self.persist_stack();

        tracing::debug!(
            "Restored shuffle history for playlist {}: {} visited, {} left",
            self.playlist_id,
            self.stack.len(),
            self.pool.len()
        );
    }

    fn reconcile_history(
        &mut self,
        removed: &[TrackId],
        previous_cursor: Option<usize>,
        current_survived: bool,
    ) {
        let removed: HashSet<&TrackId> = removed.iter().collect();
        let index = &self.index;
        let keep = |id: &TrackId| index.contains_key(id) && !removed.contains(id);

        // Entries kept below the old cursor; the one after them slides into its place
        let mut kept_below_cursor = 0;
        let old_stack = std::mem::take(&mut self.stack);
        for (i, id) in old_stack.into_iter().enumerate() {
            if keep(&id) {
                if previous_cursor.is_some_and(|c| i < c) {
                    kept_below_cursor += 1;
                }
                self.stack.push(id);
            }
        }
        self.pool.retain(|id| keep(id));

        let known: HashSet<TrackId> = self.stack.iter().chain(&self.pool).cloned().collect();
        let fresh: Vec<TrackId> = self
            .data
            .iter()
            .filter(|t| !known.contains(&t.id))
            .map(|t| t.id.clone())
            .collect();
        for id in fresh {
            insert_random(&mut self.pool, id, &mut self.rng);
        }

        let current_id = self.current_id();
        match current_id {
            Some(id) if current_survived || self.stack.is_empty() => {
                let slot = self.stack.iter().position(|s| *s == id);
                match slot {
                    Some(slot) => self.stack_cursor = Some(slot),
                    None => self.move_to_top(&id),
                }
            }
            _ => {
                self.stack_cursor = Some(kept_below_cursor.min(self.stack.len().saturating_sub(1)));
                self.sync_current_to_cursor();
            }
        }

        self.persist_stack();
    }

    fn next_shuffled(&mut self) {
        self.seed_stack();

        let top = self.stack.len().saturating_sub(1);
        match self.stack_cursor {
            Some(cursor) if cursor < top => {
                self.stack_cursor = Some(cursor + 1);
            }
            _ => {
                if self.pool.is_empty() {
                    refresh_pool(&mut self.stack, &mut self.pool, &mut self.rng);
                    self.stack_cursor = None;
                    for track in &mut self.data {
                        track.position_in_stack = None;
                    }
                    self.pending.push(PendingWrite::ClearStack);
                    tracing::debug!(
                        "Shuffle cycle exhausted for playlist {}, pool refreshed",
                        self.playlist_id
                    );
                }
                if self.pool.is_empty() {
                    return;
                }

                let id = self.pool.remove(0);
                self.stack.push(id.clone());
                let slot = self.stack.len() - 1;
                self.stack_cursor = Some(slot);
                self.assign_slot(&id, Some(slot as u32));
            }
        }

        self.sync_current_to_cursor();
    }

    fn seed_stack(&mut self) {
        if !self.stack.is_empty() {
            return;
        }
        if let Some(id) = self.current_id() {
            self.move_to_top(&id);
            self.assign_slot(&id, Some(0));
        }
    }

    fn move_to_top(&mut self, id: &TrackId) {
        self.stack.retain(|s| s != id);
        self.pool.retain(|p| p != id);
        self.stack.push(id.clone());
        self.stack_cursor = Some(self.stack.len() - 1);
    }

    fn sync_current_to_cursor(&mut self) {
        if let Some(id) = self.stack_cursor.and_then(|c| self.stack.get(c)) {
            self.current = self.index.get(id).copied();
        }
    }

    fn rebuild_pool(&mut self) {
        let mut pool: Vec<TrackId> = {
            let on_stack: HashSet<&TrackId> = self.stack.iter().collect();
            self.data
                .iter()
                .filter(|t| !on_stack.contains(&t.id))
                .map(|t| t.id.clone())
                .collect()
        };
        pool.shuffle(&mut self.rng);
        self.pool = pool;
    }

    fn persist_stack(&mut self) {
        for track in &mut self.data {
            track.position_in_stack = None;
        }
        self.pending.push(PendingWrite::ClearStack);

        for slot in 0..self.stack.len() {
            let id = self.stack[slot].clone();
            self.assign_slot(&id, Some(slot as u32));
        }
    }

    fn assign_slot(&mut self, id: &TrackId, slot: Option<u32>) {
        if let Some(&i) = self.index.get(id) {
            self.data[i].position_in_stack = slot;
        }
        self.pending.push(PendingWrite::StackSlot {
            track_id: id.clone(),
            slot,
        });
    }

    /// Assert the structural invariants (debug builds only)
    ///
    /// - positions are `0..N` in arena order
    /// - the cursor is in range whenever the queue is non-empty
    /// - in shuffle mode stack and pool partition the playlist, the stack
    ///   cursor points at the current track, and every stack entry's slot
    ///   equals its index
    pub fn check_invariants(&self) {
        if !cfg!(debug_assertions) {
            return;
        }

        debug_assert_eq!(self.index.len(), self.data.len(), "duplicate track id");
        for (i, track) in self.data.iter().enumerate() {
            debug_assert_eq!(track.position as usize, i, "position gap at {}", i);
            debug_assert_eq!(self.index.get(&track.id), Some(&i));
        }

        match self.current {
            Some(c) => debug_assert!(c < self.data.len(), "cursor {} out of range", c),
            None => debug_assert!(self.data.is_empty(), "no cursor on a non-empty queue"),
        }

        if !self.shuffle_enabled || self.data.is_empty() {
            return;
        }

        let stack: HashSet<&TrackId> = self.stack.iter().collect();
        let pool: HashSet<&TrackId> = self.pool.iter().collect();
        debug_assert_eq!(stack.len(), self.stack.len(), "duplicate stack entry");
        debug_assert_eq!(pool.len(), self.pool.len(), "duplicate pool entry");
        debug_assert!(stack.is_disjoint(&pool), "stack and pool overlap");
        debug_assert_eq!(stack.len() + pool.len(), self.data.len(), "stack + pool != data");
        debug_assert!(stack.iter().chain(pool.iter()).all(|id| self.index.contains_key(*id)));

        if let Some(cursor) = self.stack_cursor {
            debug_assert!(cursor < self.stack.len(), "stack cursor out of range");
            debug_assert_eq!(
                self.stack.get(cursor),
                self.peek_current().map(|t| &t.id),
                "stack cursor is not on the current track"
            );
        }

        for (slot, id) in self.stack.iter().enumerate() {
            let track = &self.data[self.index[id]];
            debug_assert_eq!(track.position_in_stack, Some(slot as u32), "stale slot for {}", id);
        }
    }
}
