// Rule violations raised by the resolvers and failures raised by the lab.

use thiserror::Error;

use super::monkey::MonkeyId;

/// Why two monkeys may not breed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BreedError {
    #[error("monkey {id} is too old to breed (age {age}, must be under {limit})")]
    TooOld { id: MonkeyId, age: i32, limit: i32 },

    #[error("monkey {0} cannot breed with itself")]
    SameParent(MonkeyId),

    #[error("monkeys {0} and {1} are both uncool and will not breed")]
    IncompatiblePair(MonkeyId, MonkeyId),
}

/// Why a fight could not produce a winner.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FightError {
    #[error("monkey {id} is too young to fight (age {age}, must be at least {min})")]
    TooYoung { id: MonkeyId, age: i32, min: i32 },

    #[error("monkey {0} cannot fight itself")]
    SameCombatant(MonkeyId),

    #[error("fight ended in a draw ({score} to {score})")]
    Draw { score: i32 },
}

/// Errors surfaced by the lab to its callers.
#[derive(Debug, Error)]
pub enum LabError {
    #[error("monkey {0} not found")]
    NotFound(MonkeyId),

    #[error(transparent)]
    Breeding(#[from] BreedError),

    #[error(transparent)]
    Combat(#[from] FightError),

    #[error("no free name found after {0} attempts")]
    NamesExhausted(usize),

    #[error("monkey {0} changed while the operation was running")]
    Conflict(MonkeyId),

    #[error("repository error: {0}")]
    Repository(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl LabError {
    pub(crate) fn repository<E>(e: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        LabError::Repository(Box::new(e))
    }

    /// Short label used for metrics and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            LabError::NotFound(_) => "not_found",
            LabError::Breeding(BreedError::TooOld { .. }) => "too_old",
            LabError::Breeding(BreedError::SameParent(_)) => "same_parent",
            LabError::Breeding(BreedError::IncompatiblePair(..)) => "incompatible_pair",
            LabError::Combat(FightError::TooYoung { .. }) => "too_young",
            LabError::Combat(FightError::SameCombatant(_)) => "same_combatant",
            LabError::Combat(FightError::Draw { .. }) => "draw",
            LabError::NamesExhausted(_) => "names_exhausted",
            LabError::Conflict(_) => "conflict",
            LabError::Repository(_) => "repository",
        }
    }
}
