// The lab runs breedings and fights against a monkey store.
//
// Rule checks and outcome math live in `breeding` and `combat` and never
// touch storage. The lab loads both monkeys, asks the resolver, and then
// persists the result. A birth is one `record_birth` call (child first,
// then both parents aged) and a won fight removes the loser.

use rand::Rng;

use super::breeding;
use super::combat::{self, FightOutcome};
use super::config::MAX_NAME_ATTEMPTS;
use super::error::{FightError, LabError};
use super::monkey::{Monkey, MonkeyId, NewMonkey};
use super::naming::generate_name;
use super::repository::{Birth, MonkeyRepository};
use crate::metrics;

async fn load<R: MonkeyRepository>(repo: &R, id: MonkeyId) -> Result<Monkey, LabError> {
    repo.find_by_id(id)
        .await
        .map_err(LabError::repository)?
        .ok_or(LabError::NotFound(id))
}

/// Store the child, renaming it until a name sticks.
///
/// Each attempt checks one candidate name and then inserts. A name taken
/// between the check and the insert costs an attempt, same as a clash
/// found by the check.
async fn store_child<R, G>(
    repo: &R,
    rng: &mut G,
    child: &mut NewMonkey,
    parents: [&Monkey; 2],
) -> Result<Monkey, LabError>
where
    R: MonkeyRepository,
    G: Rng + Send + ?Sized,
{
    for attempt in 0..MAX_NAME_ATTEMPTS {
        if attempt > 0 {
            child.name = generate_name(rng);
        }
        if repo
            .name_taken(&child.name)
            .await
            .map_err(LabError::repository)?
        {
            continue;
        }
        match repo
            .record_birth(child, parents)
            .await
            .map_err(LabError::repository)?
        {
            Birth::Recorded(stored) => return Ok(stored),
            Birth::NameTaken => {
                tracing::debug!(name = %child.name, "Child name taken before insert");
            }
            Birth::StaleParent(id) => {
                tracing::warn!(
                    parent = %id,
                    "Breeding aborted: a parent changed since it was loaded"
                );
                return Err(rejected(LabError::Conflict(id)));
            }
        }
    }
    Err(rejected(LabError::NamesExhausted(MAX_NAME_ATTEMPTS)))
}

fn rejected(e: LabError) -> LabError {
    metrics::SIM_REJECTIONS_TOTAL
        .with_label_values(&[e.reason()])
        .inc();
    e
}

/// Breed two stored monkeys and return the stored child.
pub async fn breed<R, G>(
    repo: &R,
    rng: &mut G,
    parent1_id: MonkeyId,
    parent2_id: MonkeyId,
) -> Result<Monkey, LabError>
where
    R: MonkeyRepository,
    G: Rng + Send + ?Sized,
{
    let parent1 = load(repo, parent1_id).await?;
    let parent2 = load(repo, parent2_id).await?;

    let mut child =
        breeding::breed(&parent1, &parent2, rng).map_err(|e| rejected(e.into()))?;
    let child = store_child(repo, rng, &mut child, [&parent1, &parent2]).await?;

    metrics::MONKEYS_BORN_TOTAL.inc();
    tracing::info!(
        child = %child.id,
        name = %child.name,
        parent1 = %parent1.id,
        parent2 = %parent2.id,
        "Monkey born"
    );
    Ok(child)
}

/// Fight two stored monkeys, delete the loser and return the outcome.
pub async fn fight<R, G>(
    repo: &R,
    rng: &mut G,
    monkey1_id: MonkeyId,
    monkey2_id: MonkeyId,
) -> Result<FightOutcome, LabError>
where
    R: MonkeyRepository,
    G: Rng + Send + ?Sized,
{
    let monkey1 = load(repo, monkey1_id).await?;
    let monkey2 = load(repo, monkey2_id).await?;

    let outcome = match combat::fight(&monkey1, &monkey2, rng) {
        Ok(outcome) => outcome,
        Err(e) => {
            if matches!(e, FightError::Draw { .. }) {
                metrics::FIGHTS_TOTAL.with_label_values(&["draw"]).inc();
            }
            return Err(rejected(e.into()));
        }
    };

    if !repo
        .remove(outcome.loser_id)
        .await
        .map_err(LabError::repository)?
    {
        tracing::warn!(loser = %outcome.loser_id, "Fight aborted: loser already gone");
        return Err(rejected(LabError::Conflict(outcome.loser_id)));
    }

    metrics::FIGHTS_TOTAL.with_label_values(&["win"]).inc();
    tracing::info!(
        winner = %outcome.winner.id,
        loser = %outcome.loser_id,
        winner_score = outcome.winner_score,
        loser_score = outcome.loser_score,
        "Monkey eliminated"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::breeding::tests::monkey;
    use crate::engine::error::BreedError;
    use crate::engine::repository::memory::MemoryRepository;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_breed_stores_child_and_ages_parents() {
        let repo = MemoryRepository::with(vec![monkey(1, 4, true, 50), monkey(2, 7, false, 70)]);
        let mut rng = StdRng::seed_from_u64(1);

        let child = breed(&repo, &mut rng, MonkeyId(1), MonkeyId(2))
            .await
            .unwrap();
        assert_eq!(child.id, MonkeyId(3));
        assert_eq!(child.age, 0);
        assert!(!child.is_cool);
        assert_eq!(child.parent1_id, Some(MonkeyId(1)));
        assert_eq!(child.parent2_id, Some(MonkeyId(2)));
        assert_eq!(repo.get(3), Some(child));

        assert_eq!(repo.get(1).unwrap().age, 5);
        assert_eq!(repo.get(2).unwrap().age, 8);
    }

    #[tokio::test]
    async fn test_rejected_breeding_mutates_nothing() {
        let repo = MemoryRepository::with(vec![monkey(1, 20, true, 50), monkey(2, 3, true, 50)]);
        let mut rng = StdRng::seed_from_u64(2);

        let err = breed(&repo, &mut rng, MonkeyId(1), MonkeyId(2))
            .await
            .unwrap_err();
        assert!(matches!(err, LabError::Breeding(BreedError::TooOld { .. })));
        assert_eq!(repo.len(), 2);
        assert_eq!(repo.get(1).unwrap().age, 20);
        assert_eq!(repo.get(2).unwrap().age, 3);
    }

    #[tokio::test]
    async fn test_breed_with_self_and_uncool_pair() {
        let repo = MemoryRepository::with(vec![monkey(1, 2, false, 50), monkey(2, 3, false, 50)]);
        let mut rng = StdRng::seed_from_u64(3);

        let err = breed(&repo, &mut rng, MonkeyId(1), MonkeyId(1))
            .await
            .unwrap_err();
        assert!(matches!(err, LabError::Breeding(BreedError::SameParent(_))));

        let err = breed(&repo, &mut rng, MonkeyId(1), MonkeyId(2))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LabError::Breeding(BreedError::IncompatiblePair(..))
        ));
        assert_eq!(repo.get(1).unwrap().age, 2);
    }

    #[tokio::test]
    async fn test_breed_missing_parent() {
        let repo = MemoryRepository::with(vec![monkey(1, 2, true, 50)]);
        let mut rng = StdRng::seed_from_u64(4);
        let err = breed(&repo, &mut rng, MonkeyId(1), MonkeyId(42))
            .await
            .unwrap_err();
        assert!(matches!(err, LabError::NotFound(MonkeyId(42))));
    }

    #[tokio::test]
    async fn test_stale_parent_snapshot_stores_nothing() {
        let repo = MemoryRepository::with(vec![monkey(1, 2, true, 50), monkey(2, 3, true, 50)]);
        let parent1 = repo.get(1).unwrap();
        let mut stale = repo.get(2).unwrap();
        stale.age = 1;

        let mut child = breeding::derive_child(
            &parent1,
            &stale,
            breeding::StatOffsets::uniform(0),
            "zazu".into(),
        );
        let mut rng = StdRng::seed_from_u64(10);
        let err = store_child(&repo, &mut rng, &mut child, [&parent1, &stale])
            .await
            .unwrap_err();
        assert!(matches!(err, LabError::Conflict(MonkeyId(2))));
        assert_eq!(repo.len(), 2);
        assert_eq!(repo.get(1).unwrap().age, 2);
    }

    #[tokio::test]
    async fn test_name_taken_before_insert_is_renamed() {
        let repo = MemoryRepository::with(vec![monkey(1, 2, true, 50), monkey(2, 3, true, 50)]);
        repo.steal_next_name.store(true, Ordering::SeqCst);
        let mut rng = StdRng::seed_from_u64(11);

        let child = breed(&repo, &mut rng, MonkeyId(1), MonkeyId(2))
            .await
            .unwrap();
        let squatter = repo.get(3).unwrap();
        assert_eq!(child.id, MonkeyId(4));
        assert_ne!(child.name, squatter.name);
        assert!(repo.name_checks() >= 2);
        assert_eq!(repo.len(), 4);
        assert_eq!(repo.get(1).unwrap().age, 3);
    }

    #[tokio::test]
    async fn test_every_candidate_name_is_checked() {
        let mut repo =
            MemoryRepository::with(vec![monkey(1, 2, true, 50), monkey(2, 3, true, 50)]);
        repo.all_names_taken = true;
        let mut rng = StdRng::seed_from_u64(12);

        let err = breed(&repo, &mut rng, MonkeyId(1), MonkeyId(2))
            .await
            .unwrap_err();
        assert!(matches!(err, LabError::NamesExhausted(MAX_NAME_ATTEMPTS)));
        assert_eq!(repo.name_checks(), MAX_NAME_ATTEMPTS);
        assert_eq!(repo.len(), 2);
        assert_eq!(repo.get(1).unwrap().age, 2);
    }

    #[tokio::test]
    async fn test_storage_failure_is_propagated() {
        let mut repo =
            MemoryRepository::with(vec![monkey(1, 2, true, 50), monkey(2, 3, true, 50)]);
        repo.fail_writes = true;
        let mut rng = StdRng::seed_from_u64(5);

        let err = breed(&repo, &mut rng, MonkeyId(1), MonkeyId(2))
            .await
            .unwrap_err();
        assert!(matches!(err, LabError::Repository(_)));
        assert_eq!(repo.len(), 2);
    }

    #[tokio::test]
    async fn test_colliding_names_are_regenerated() {
        let repo = MemoryRepository::with(vec![monkey(1, 2, true, 50), monkey(2, 3, true, 50)]);
        let parent1 = repo.get(1).unwrap();
        let parent2 = repo.get(2).unwrap();
        let mut rng = StdRng::seed_from_u64(6);
        let mut child = breeding::derive_child(
            &parent1,
            &parent2,
            breeding::StatOffsets::uniform(0),
            "monkey1".into(),
        );

        let stored = store_child(&repo, &mut rng, &mut child, [&parent1, &parent2])
            .await
            .unwrap();
        assert_ne!(stored.name, "monkey1");
        assert_eq!(repo.get(3), Some(stored));
    }

    #[tokio::test]
    async fn test_fight_removes_only_the_loser() {
        let repo = MemoryRepository::with(vec![monkey(1, 10, true, 90), monkey(2, 50, true, 10)]);
        let mut rng = StdRng::seed_from_u64(7);

        let outcome = fight(&repo, &mut rng, MonkeyId(2), MonkeyId(1))
            .await
            .unwrap();
        assert_eq!(outcome.winner.id, MonkeyId(1));
        assert_eq!(outcome.loser_id, MonkeyId(2));
        assert!(repo.get(1).is_some());
        assert!(repo.get(2).is_none());
    }

    #[tokio::test]
    async fn test_rejected_fight_deletes_nothing() {
        let repo = MemoryRepository::with(vec![monkey(1, 9, true, 90), monkey(2, 50, true, 10)]);
        let mut rng = StdRng::seed_from_u64(8);

        let err = fight(&repo, &mut rng, MonkeyId(1), MonkeyId(2))
            .await
            .unwrap_err();
        assert!(matches!(err, LabError::Combat(FightError::TooYoung { .. })));

        let err = fight(&repo, &mut rng, MonkeyId(2), MonkeyId(2))
            .await
            .unwrap_err();
        assert!(matches!(err, LabError::Combat(FightError::SameCombatant(_))));
        assert_eq!(repo.len(), 2);
    }

    #[tokio::test]
    async fn test_draws_delete_nothing() {
        let repo = MemoryRepository::with(vec![monkey(1, 10, true, 50), monkey(2, 10, true, 50)]);
        let mut rng = StdRng::seed_from_u64(9);

        // Equal stats draw whenever both offsets match; try until one does.
        let mut saw_draw = false;
        for _ in 0..200 {
            let repo_copy =
                MemoryRepository::with(vec![repo.get(1).unwrap(), repo.get(2).unwrap()]);
            match fight(&repo_copy, &mut rng, MonkeyId(1), MonkeyId(2)).await {
                Err(LabError::Combat(FightError::Draw { score })) => {
                    assert!((140..=160).contains(&score));
                    assert_eq!(repo_copy.len(), 2);
                    saw_draw = true;
                    break;
                }
                Ok(_) => assert_eq!(repo_copy.len(), 1),
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert!(saw_draw);
    }
}
