//! Shuffle pool maintenance
//!
//! The pool is kept pre-shuffled, so drawing is always `pool.remove(0)`.

use rand::seq::SliceRandom;
use rand::Rng;
use reprise_core::TrackId;

/// Start a new shuffle cycle
///
/// The last stack entry (the track that just played) becomes the anchor.
/// Every other stack entry returns to the pool, the pool is shuffled, and the
/// anchor is put back anywhere except the front so it cannot play twice in a
/// row across the cycle boundary. With nothing else in the pool the anchor
/// goes to the front.
///
/// The stack is left empty.
pub fn refresh_pool<R: Rng + ?Sized>(stack: &mut Vec<TrackId>, pool: &mut Vec<TrackId>, rng: &mut R) {
    let anchor = stack.pop();
    pool.append(stack);
    pool.shuffle(rng);

    if let Some(anchor) = anchor {
        if pool.is_empty() {
            pool.push(anchor);
        } else {
            let slot = rng.gen_range(1..=pool.len());
            pool.insert(slot, anchor);
        }
    }
}

/// Insert a newly added track at a random slot
pub fn insert_random<R: Rng + ?Sized>(pool: &mut Vec<TrackId>, id: TrackId, rng: &mut R) {
    let slot = rng.gen_range(0..=pool.len());
    pool.insert(slot, id);
}
