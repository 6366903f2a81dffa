use serde::{Deserialize, Serialize};

use super::config::{STAT_MAX, STAT_MIN};

/// Database identity of a monkey. Equality is by value.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct MonkeyId(pub i64);

impl std::fmt::Display for MonkeyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored monkey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Monkey {
    pub id: MonkeyId,
    pub name: String,
    pub age: i32,
    pub is_cool: bool,
    pub strength: i32,
    pub intelligence: i32,
    pub speed: i32,
    pub parent1_id: Option<MonkeyId>,
    pub parent2_id: Option<MonkeyId>,
    pub created_at: String,
    pub updated_at: String,
}

impl Monkey {
    pub fn stats(&self) -> Stats {
        Stats {
            strength: self.strength,
            intelligence: self.intelligence,
            speed: self.speed,
        }
    }
}

/// A monkey that has not been stored yet, either from direct intake or
/// from breeding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMonkey {
    pub name: String,
    pub age: i32,
    pub is_cool: bool,
    pub strength: i32,
    pub intelligence: i32,
    pub speed: i32,
    pub parent1_id: Option<MonkeyId>,
    pub parent2_id: Option<MonkeyId>,
}

impl NewMonkey {
    pub fn stats(&self) -> Stats {
        Stats {
            strength: self.strength,
            intelligence: self.intelligence,
            speed: self.speed,
        }
    }
}

/// The three fighting attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub strength: i32,
    pub intelligence: i32,
    pub speed: i32,
}

impl Stats {
    pub fn total(self) -> i32 {
        self.strength + self.intelligence + self.speed
    }

    /// Name of the first attribute outside the intake range, if any.
    pub fn out_of_bounds(self) -> Option<&'static str> {
        [
            ("strength", self.strength),
            ("intelligence", self.intelligence),
            ("speed", self.speed),
        ]
        .into_iter()
        .find(|&(_, value)| !stat_in_range(value))
        .map(|(field, _)| field)
    }
}

/// Whether a single attribute value lies in [0, 100].
pub fn stat_in_range(value: i32) -> bool {
    (STAT_MIN..=STAT_MAX).contains(&value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monkey_id_compares_by_value() {
        let a = MonkeyId(7);
        let b = MonkeyId("7".parse().unwrap());
        assert_eq!(a, b);
        assert_ne!(a, MonkeyId(8));
    }

    #[test]
    fn test_monkey_id_serializes_as_number() {
        assert_eq!(serde_json::to_string(&MonkeyId(42)).unwrap(), "42");
        let id: MonkeyId = serde_json::from_str("42").unwrap();
        assert_eq!(id, MonkeyId(42));
    }

    #[test]
    fn test_stats_total_and_bounds() {
        let s = Stats {
            strength: 10,
            intelligence: 20,
            speed: 30,
        };
        assert_eq!(s.total(), 60);
        assert_eq!(s.out_of_bounds(), None);

        let over = Stats { speed: 101, ..s };
        assert_eq!(over.out_of_bounds(), Some("speed"));
        let both = Stats {
            strength: -1,
            ..over
        };
        assert_eq!(both.out_of_bounds(), Some("strength"));
        assert!(stat_in_range(0) && stat_in_range(100));
    }
}
