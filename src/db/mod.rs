// Database access layer (SQLite via sqlx).

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::engine::monkey::{Monkey, MonkeyId, NewMonkey};
use crate::engine::repository::{Birth, MonkeyRepository};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: String,
}

/// Partial monkey update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MonkeyChanges {
    pub name: Option<String>,
    pub age: Option<i32>,
    pub is_cool: Option<bool>,
    pub strength: Option<i32>,
    pub intelligence: Option<i32>,
    pub speed: Option<i32>,
}

const MONKEY_COLUMNS: &str = "id, name, age, is_cool, strength, intelligence, speed, parent1_id, parent2_id, created_at, updated_at";

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        // Every connection to `:memory:` is its own database, so keep exactly one.
        let options = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = options.connect(database_url).await?;
        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        // Parent ids are lineage only: no foreign key, parents may be deleted.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS monkeys (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                age INTEGER NOT NULL DEFAULT 0,
                is_cool INTEGER NOT NULL DEFAULT 0,
                strength INTEGER NOT NULL,
                intelligence INTEGER NOT NULL,
                speed INTEGER NOT NULL,
                parent1_id INTEGER,
                parent2_id INTEGER,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // ── User CRUD ─────────────────────────────────────────────────────

    pub async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, sqlx::Error> {
        let row = sqlx::query_as::<_, User>(
            "INSERT INTO users (email, password_hash) VALUES (?, ?) RETURNING id, email, password_hash, created_at",
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn list_users(&self) -> Result<Vec<User>, sqlx::Error> {
        let rows = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, created_at FROM users ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_user(&self, id: i64) -> Result<Option<User>, sqlx::Error> {
        let row = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        let row = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, created_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn update_user(
        &self,
        id: i64,
        email: Option<&str>,
        password_hash: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET email = COALESCE(?, email), password_hash = COALESCE(?, password_hash) WHERE id = ?",
        )
        .bind(email)
        .bind(password_hash)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_user(id).await
    }

    pub async fn delete_user(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ── Monkey CRUD ───────────────────────────────────────────────────

    pub async fn create_monkey(&self, monkey: &NewMonkey) -> Result<Monkey, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        insert_monkey(&mut conn, monkey).await
    }

    pub async fn list_monkeys(&self) -> Result<Vec<Monkey>, sqlx::Error> {
        let rows = sqlx::query_as::<_, Monkey>(&format!(
            "SELECT {MONKEY_COLUMNS} FROM monkeys ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_monkey(&self, id: MonkeyId) -> Result<Option<Monkey>, sqlx::Error> {
        let row = sqlx::query_as::<_, Monkey>(&format!(
            "SELECT {MONKEY_COLUMNS} FROM monkeys WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn monkey_name_exists(&self, name: &str) -> Result<bool, sqlx::Error> {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM monkeys WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    pub async fn update_monkey(
        &self,
        id: MonkeyId,
        changes: &MonkeyChanges,
    ) -> Result<Option<Monkey>, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE monkeys SET
                name = COALESCE(?, name),
                age = COALESCE(?, age),
                is_cool = COALESCE(?, is_cool),
                strength = COALESCE(?, strength),
                intelligence = COALESCE(?, intelligence),
                speed = COALESCE(?, speed),
                updated_at = datetime('now')
            WHERE id = ?
            "#,
        )
        .bind(changes.name.as_deref())
        .bind(changes.age)
        .bind(changes.is_cool)
        .bind(changes.strength)
        .bind(changes.intelligence)
        .bind(changes.speed)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_monkey(id).await
    }

    pub async fn delete_monkey(&self, id: MonkeyId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM monkeys WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Insert a bred child and age both parents in one transaction.
    ///
    /// Parents are aged with `age = age + 1` guarded by the age they had in
    /// the caller's snapshot. A name clash or a missed guard rolls the
    /// transaction back.
    pub async fn record_birth(
        &self,
        child: &NewMonkey,
        parents: [&Monkey; 2],
    ) -> Result<Birth, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let stored = match insert_monkey(&mut tx, child).await {
            Ok(stored) => stored,
            Err(e) if is_unique_violation(&e) => {
                tx.rollback().await?;
                return Ok(Birth::NameTaken);
            }
            Err(e) => return Err(e),
        };

        for parent in parents {
            let result = sqlx::query(
                "UPDATE monkeys SET age = age + 1, updated_at = datetime('now') WHERE id = ? AND age = ?",
            )
            .bind(parent.id)
            .bind(parent.age)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() != 1 {
                tx.rollback().await?;
                return Ok(Birth::StaleParent(parent.id));
            }
        }

        tx.commit().await?;
        Ok(Birth::Recorded(stored))
    }
}

async fn insert_monkey(
    conn: &mut sqlx::SqliteConnection,
    monkey: &NewMonkey,
) -> Result<Monkey, sqlx::Error> {
    sqlx::query_as::<_, Monkey>(&format!(
        "INSERT INTO monkeys (name, age, is_cool, strength, intelligence, speed, parent1_id, parent2_id) VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING {MONKEY_COLUMNS}"
    ))
    .bind(&monkey.name)
    .bind(monkey.age)
    .bind(monkey.is_cool)
    .bind(monkey.strength)
    .bind(monkey.intelligence)
    .bind(monkey.speed)
    .bind(monkey.parent1_id)
    .bind(monkey.parent2_id)
    .fetch_one(&mut *conn)
    .await
}

/// Whether a sqlx error is a UNIQUE constraint violation.
pub fn is_unique_violation(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}

impl MonkeyRepository for Database {
    type Error = sqlx::Error;

    async fn find_by_id(&self, id: MonkeyId) -> Result<Option<Monkey>, sqlx::Error> {
        self.get_monkey(id).await
    }

    async fn name_taken(&self, name: &str) -> Result<bool, sqlx::Error> {
        self.monkey_name_exists(name).await
    }

    async fn record_birth(
        &self,
        child: &NewMonkey,
        parents: [&Monkey; 2],
    ) -> Result<Birth, sqlx::Error> {
        Database::record_birth(self, child, parents).await
    }

    async fn remove(&self, id: MonkeyId) -> Result<bool, sqlx::Error> {
        self.delete_monkey(id).await
    }
}
