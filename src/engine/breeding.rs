// Breeding rules: who may breed and what the child looks like.

use rand::Rng;

use super::config::{BREEDING_AGE_LIMIT, STAT_MAX, STAT_MIN, STAT_OFFSET_RANGE};
use super::error::BreedError;
use super::monkey::{Monkey, NewMonkey, Stats};
use super::naming::generate_name;

/// Random offsets applied to the averaged parent stats, one per attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatOffsets {
    pub strength: i32,
    pub intelligence: i32,
    pub speed: i32,
}

impl StatOffsets {
    /// Three independent draws in [-10, 10].
    pub fn roll<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            strength: rng.gen_range(-STAT_OFFSET_RANGE..=STAT_OFFSET_RANGE),
            intelligence: rng.gen_range(-STAT_OFFSET_RANGE..=STAT_OFFSET_RANGE),
            speed: rng.gen_range(-STAT_OFFSET_RANGE..=STAT_OFFSET_RANGE),
        }
    }

    #[cfg(test)]
    pub fn uniform(offset: i32) -> Self {
        Self {
            strength: offset,
            intelligence: offset,
            speed: offset,
        }
    }
}

/// Check the breeding preconditions in order: age, identity, coolness.
pub fn check_parents(parent1: &Monkey, parent2: &Monkey) -> Result<(), BreedError> {
    for parent in [parent1, parent2] {
        if parent.age >= BREEDING_AGE_LIMIT {
            return Err(BreedError::TooOld {
                id: parent.id,
                age: parent.age,
                limit: BREEDING_AGE_LIMIT,
            });
        }
    }

    if parent1.id == parent2.id {
        return Err(BreedError::SameParent(parent1.id));
    }

    if !parent1.is_cool && !parent2.is_cool {
        return Err(BreedError::IncompatiblePair(parent1.id, parent2.id));
    }

    Ok(())
}

/// Floor of the parents' mean plus `offset`, clamped into [0, 100].
fn inherit(a: i32, b: i32, offset: i32) -> i32 {
    ((a + b).div_euclid(2) + offset).clamp(STAT_MIN, STAT_MAX)
}

/// Derive the child's stats from its parents and a set of offsets.
pub fn child_stats(parent1: Stats, parent2: Stats, offsets: StatOffsets) -> Stats {
    Stats {
        strength: inherit(parent1.strength, parent2.strength, offsets.strength),
        intelligence: inherit(
            parent1.intelligence,
            parent2.intelligence,
            offsets.intelligence,
        ),
        speed: inherit(parent1.speed, parent2.speed, offsets.speed),
    }
}

/// Build the child record. Does not check preconditions.
pub fn derive_child(
    parent1: &Monkey,
    parent2: &Monkey,
    offsets: StatOffsets,
    name: String,
) -> NewMonkey {
    let stats = child_stats(parent1.stats(), parent2.stats(), offsets);
    NewMonkey {
        name,
        age: 0,
        is_cool: parent1.is_cool && parent2.is_cool,
        strength: stats.strength,
        intelligence: stats.intelligence,
        speed: stats.speed,
        parent1_id: Some(parent1.id),
        parent2_id: Some(parent2.id),
    }
}

/// Breed two monkeys.
///
/// Validates both parents, then derives the child's stats and name from
/// `rng`. Nothing is aged or stored here; see [`crate::engine::lab::breed`].
pub fn breed<R: Rng + ?Sized>(
    parent1: &Monkey,
    parent2: &Monkey,
    rng: &mut R,
) -> Result<NewMonkey, BreedError> {
    check_parents(parent1, parent2)?;
    let offsets = StatOffsets::roll(rng);
    let name = generate_name(rng);
    Ok(derive_child(parent1, parent2, offsets, name))
}
