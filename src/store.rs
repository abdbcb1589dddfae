//! Persistence for extracted recipes.
//!
//! A recipe is keyed by its source URL. Ingredients are shared rows linked
//! through a join table that carries quantity, unit and position.

use crate::error::ExtractError;
use crate::model::{Ingredient, Recipe, Step, Unit};
use log::info;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

const SCHEMA: &str = "
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS recipe (
    id                INTEGER PRIMARY KEY,
    source_url        TEXT    NOT NULL UNIQUE,
    source_text       TEXT    NOT NULL,
    name              TEXT    NOT NULL,
    prep_time_minutes INTEGER NOT NULL,
    last_generated    INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS ingredient (
    id   INTEGER PRIMARY KEY,
    name TEXT    NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS recipe_ingredient (
    id            INTEGER PRIMARY KEY,
    recipe_id     INTEGER NOT NULL REFERENCES recipe(id) ON DELETE CASCADE,
    ingredient_id INTEGER NOT NULL REFERENCES ingredient(id) ON DELETE RESTRICT,
    position      INTEGER NOT NULL,
    quantity      REAL,
    unit          TEXT CHECK (unit IN ('g', 'ml'))
);

CREATE TABLE IF NOT EXISTS recipe_step (
    recipe_id INTEGER NOT NULL REFERENCES recipe(id) ON DELETE CASCADE,
    position  INTEGER NOT NULL,
    text      TEXT    NOT NULL,
    PRIMARY KEY (recipe_id, position)
);
";

/// The persisted form of an extracted recipe
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeRecord {
    pub source_url: String,
    /// Page text the recipe was extracted from
    pub source_text: String,
    pub recipe: Recipe,
    /// Seconds since the Unix epoch
    pub last_generated: i64,
}

impl RecipeRecord {
    pub fn new(source_url: impl Into<String>, source_text: impl Into<String>, recipe: Recipe) -> Self {
        let last_generated = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default();
        Self {
            source_url: source_url.into(),
            source_text: source_text.into(),
            recipe,
            last_generated,
        }
    }
}

/// One-way sink for extracted recipes
pub trait RecipeStore: Send + Sync {
    /// Store a record, rejecting a source URL that is already present
    fn save(&self, record: &RecipeRecord) -> Result<i64, ExtractError>;

    fn load(&self, source_url: &str) -> Result<Option<RecipeRecord>, ExtractError>;

    fn contains(&self, source_url: &str) -> Result<bool, ExtractError> {
        Ok(self.load(source_url)?.is_some())
    }
}

impl<T: RecipeStore + ?Sized> RecipeStore for Arc<T> {
    fn save(&self, record: &RecipeRecord) -> Result<i64, ExtractError> {
        (**self).save(record)
    }

    fn load(&self, source_url: &str) -> Result<Option<RecipeRecord>, ExtractError> {
        (**self).load(source_url)
    }

    fn contains(&self, source_url: &str) -> Result<bool, ExtractError> {
        (**self).contains(source_url)
    }
}

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ExtractError> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, ExtractError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, ExtractError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl RecipeStore for SqliteStore {
    fn save(&self, record: &RecipeRecord) -> Result<i64, ExtractError> {
        let mut conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let tx = conn.transaction()?;

        let inserted = tx.execute(
            "INSERT INTO recipe (source_url, source_text, name, prep_time_minutes, last_generated)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.source_url,
                record.source_text,
                record.recipe.name,
                record.recipe.prep_time_minutes,
                record.last_generated
            ],
        );
        match inserted {
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                return Err(ExtractError::DuplicateSource(record.source_url.clone()));
            }
            other => other?,
        };
        let recipe_id = tx.last_insert_rowid();

        for (position, ingredient) in record.recipe.ingredients.iter().enumerate() {
            tx.execute(
                "INSERT INTO ingredient (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
                params![ingredient.name],
            )?;
            let ingredient_id: i64 = tx.query_row(
                "SELECT id FROM ingredient WHERE name = ?1",
                params![ingredient.name],
                |row| row.get(0),
            )?;
            tx.execute(
                "INSERT INTO recipe_ingredient (recipe_id, ingredient_id, position, quantity, unit)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    recipe_id,
                    ingredient_id,
                    position as i64,
                    ingredient.quantity,
                    ingredient.unit.code()
                ],
            )?;
        }

        for (position, step) in record.recipe.steps.iter().enumerate() {
            tx.execute(
                "INSERT INTO recipe_step (recipe_id, position, text) VALUES (?1, ?2, ?3)",
                params![recipe_id, position as i64, step.text],
            )?;
        }

        tx.commit()?;
        info!("Stored recipe '{}' from {}", record.recipe.name, record.source_url);
        Ok(recipe_id)
    }

    fn contains(&self, source_url: &str) -> Result<bool, ExtractError> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let found = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM recipe WHERE source_url = ?1)",
            params![source_url],
            |row| row.get(0),
        )?;
        Ok(found)
    }

    fn load(&self, source_url: &str) -> Result<Option<RecipeRecord>, ExtractError> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);

        let row = conn
            .query_row(
                "SELECT id, source_text, name, prep_time_minutes, last_generated
                 FROM recipe WHERE source_url = ?1",
                params![source_url],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, u32>(3)?,
                        row.get::<_, i64>(4)?,
                    ))
                },
            )
            .optional()?;
        let Some((recipe_id, source_text, name, prep_time_minutes, last_generated)) = row else {
            return Ok(None);
        };

        let mut statement = conn.prepare(
            "SELECT i.name, ri.quantity, ri.unit
             FROM recipe_ingredient ri JOIN ingredient i ON i.id = ri.ingredient_id
             WHERE ri.recipe_id = ?1 ORDER BY ri.position",
        )?;
        let ingredients = statement
            .query_map(params![recipe_id], |row| {
                let unit: Option<String> = row.get(2)?;
                Ok(Ingredient {
                    name: row.get(0)?,
                    quantity: row.get(1)?,
                    unit: Unit::from_code(unit.as_deref()),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut statement =
            conn.prepare("SELECT text FROM recipe_step WHERE recipe_id = ?1 ORDER BY position")?;
        let steps = statement
            .query_map(params![recipe_id], |row| Ok(Step { text: row.get(0)? }))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(RecipeRecord {
            source_url: source_url.to_string(),
            source_text,
            recipe: Recipe {
                name,
                ingredients,
                steps,
                prep_time_minutes,
            },
            last_generated,
        }))
    }
}
