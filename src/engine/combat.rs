// Combat rules: fight preconditions and deciding the loser.

use rand::Rng;
use serde::Serialize;

use super::config::{FIGHTING_MIN_AGE, LIFE_OFFSET_RANGE};
use super::error::FightError;
use super::monkey::{Monkey, MonkeyId, Stats};

/// Result of a decided fight. The loser is only named; removing it is up
/// to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FightOutcome {
    pub winner: Monkey,
    pub loser_id: MonkeyId,
    pub winner_score: i32,
    pub loser_score: i32,
}

pub fn check_combatants(monkey1: &Monkey, monkey2: &Monkey) -> Result<(), FightError> {
    for m in [monkey1, monkey2] {
        if m.age < FIGHTING_MIN_AGE {
            return Err(FightError::TooYoung {
                id: m.id,
                age: m.age,
                min: FIGHTING_MIN_AGE,
            });
        }
    }

    if monkey1.id == monkey2.id {
        return Err(FightError::SameCombatant(monkey1.id));
    }

    Ok(())
}

pub fn life_score(stats: Stats, offset: i32) -> i32 {
    stats.total() + offset
}

/// Decide a fight from pre-drawn offsets. Preconditions are not checked.
pub fn resolve(
    monkey1: &Monkey,
    monkey2: &Monkey,
    offset1: i32,
    offset2: i32,
) -> Result<FightOutcome, FightError> {
    let score1 = life_score(monkey1.stats(), offset1);
    let score2 = life_score(monkey2.stats(), offset2);

    let (winner, loser, winner_score, loser_score) = match score1.cmp(&score2) {
        std::cmp::Ordering::Greater => (monkey1, monkey2, score1, score2),
        std::cmp::Ordering::Less => (monkey2, monkey1, score2, score1),
        std::cmp::Ordering::Equal => return Err(FightError::Draw { score: score1 }),
    };

    Ok(FightOutcome {
        winner: winner.clone(),
        loser_id: loser.id,
        winner_score,
        loser_score,
    })
}

/// Fight two monkeys, drawing one life score offset per combatant.
pub fn fight<R: Rng + ?Sized>(
    monkey1: &Monkey,
    monkey2: &Monkey,
    rng: &mut R,
) -> Result<FightOutcome, FightError> {
    check_combatants(monkey1, monkey2)?;
    let offset1 = rng.gen_range(-LIFE_OFFSET_RANGE..=LIFE_OFFSET_RANGE);
    let offset2 = rng.gen_range(-LIFE_OFFSET_RANGE..=LIFE_OFFSET_RANGE);
    resolve(monkey1, monkey2, offset1, offset2)
}
