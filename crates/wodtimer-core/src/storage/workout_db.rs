//! SQLite-based workout storage.
//!
//! One row per workout; the block list is stored as a JSON column since
//! blocks are always loaded and saved wholesale with their workout.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use super::data_dir;
use crate::error::{CoreError, DatabaseError, Result, ValidationError};
use crate::workout::{NewWorkout, Workout, WorkoutBlock, WorkoutStore};

/// SQLite database holding the workout library.
pub struct WorkoutDb {
    conn: Connection,
}

struct WorkoutRow {
    id: String,
    name: String,
    blocks: String,
    created_at: String,
}

impl WorkoutRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            blocks: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    fn decode(self) -> Result<Workout> {
        let corrupt = |message: String| DatabaseError::CorruptRecord {
            id: self.id.clone(),
            message,
        };
        let blocks: Vec<WorkoutBlock> =
            serde_json::from_str(&self.blocks).map_err(|e| corrupt(e.to_string()))?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| corrupt(e.to_string()))?
            .with_timezone(&Utc);
        Ok(Workout {
            id: self.id,
            name: self.name,
            blocks,
            created_at,
        })
    }
}

impl WorkoutDb {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `~/.config/wodtimer/wodtimer.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        Self::open_at(&data_dir()?.join("wodtimer.db"))
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS workouts (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                blocks      TEXT NOT NULL DEFAULT '[]',
                created_at  TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_workouts_created_at ON workouts(created_at);",
        )?;
        Ok(())
    }

    fn save_blocks(&self, workout: &Workout) -> Result<()> {
        let blocks = serde_json::to_string(&workout.blocks)?;
        self.conn.execute(
            "UPDATE workouts SET blocks = ?1 WHERE id = ?2",
            params![blocks, workout.id],
        )?;
        Ok(())
    }
}

fn not_found(id: &str) -> CoreError {
    ValidationError::NotFound {
        collection: "workouts".into(),
        id: id.to_string(),
    }
    .into()
}

impl WorkoutStore for WorkoutDb {
    fn load_workouts(&self) -> Result<Vec<Workout>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, blocks, created_at FROM workouts
             ORDER BY rowid ASC",
        )?;
        let rows = stmt
            .query_map([], WorkoutRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(WorkoutRow::decode).collect()
    }

    fn create_workout(&self, new: NewWorkout) -> Result<Workout> {
        new.validate()?;
        let workout = new.into_workout();
        self.conn.execute(
            "INSERT INTO workouts (id, name, blocks, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                workout.id,
                workout.name,
                serde_json::to_string(&workout.blocks)?,
                workout.created_at.to_rfc3339(),
            ],
        )?;
        debug!(workout_id = %workout.id, name = %workout.name, "workout created");
        Ok(workout)
    }

    fn delete_workout(&self, id: &str) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM workouts WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(not_found(id));
        }
        debug!(workout_id = id, "workout deleted");
        Ok(())
    }

    fn get_workout_by_id(&self, id: &str) -> Result<Option<Workout>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, name, blocks, created_at FROM workouts WHERE id = ?1",
                params![id],
                WorkoutRow::from_row,
            )
            .optional()?;
        row.map(WorkoutRow::decode).transpose()
    }

    fn add_block(&self, workout_id: &str, block: WorkoutBlock) -> Result<Workout> {
        block.validate()?;
        let mut workout = self
            .get_workout_by_id(workout_id)?
            .ok_or_else(|| not_found(workout_id))?;
        workout.blocks.push(block);
        self.save_blocks(&workout)?;
        debug!(workout_id, blocks = workout.blocks.len(), "block added");
        Ok(workout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::{TimeCap, TimerConfig};

    fn tabata() -> WorkoutBlock {
        WorkoutBlock::new(
            TimerConfig::Tabata {
                rounds: 8,
                work_secs: 20,
                rest_secs: 10,
            },
            None,
        )
        .unwrap()
    }

    #[test]
    fn create_and_list() {
        let db = WorkoutDb::open_memory().unwrap();
        db.create_workout(NewWorkout::named("Fran")).unwrap();
        db.create_workout(NewWorkout::named("Grace")).unwrap();
        let names: Vec<String> = db
            .load_workouts()
            .unwrap()
            .into_iter()
            .map(|w| w.name)
            .collect();
        assert_eq!(names, ["Fran", "Grace"]);
    }

    #[test]
    fn blocks_survive_roundtrip() {
        let db = WorkoutDb::open_memory().unwrap();
        let w = db.create_workout(NewWorkout::named("Mixed")).unwrap();
        let block = tabata();
        db.add_block(&w.id, block.clone()).unwrap();
        db.add_block(
            &w.id,
            WorkoutBlock::new(
                TimerConfig::Amrap {
                    cap: TimeCap::new(12, 0),
                },
                Some(2),
            )
            .unwrap(),
        )
        .unwrap();

        let loaded = db.get_workout_by_id(&w.id).unwrap().unwrap();
        assert_eq!(loaded.blocks.len(), 2);
        assert_eq!(loaded.blocks[0], block);
        assert_eq!(loaded.blocks[1].sets, Some(2));
    }

    #[test]
    fn missing_workout_is_none() {
        let db = WorkoutDb::open_memory().unwrap();
        assert!(db.get_workout_by_id("nope").unwrap().is_none());
        assert!(db.delete_workout("nope").is_err());
        assert!(db.add_block("nope", tabata()).is_err());
    }

    #[test]
    fn delete_removes_row() {
        let db = WorkoutDb::open_memory().unwrap();
        let w = db.create_workout(NewWorkout::named("Helen")).unwrap();
        db.delete_workout(&w.id).unwrap();
        assert!(db.load_workouts().unwrap().is_empty());
    }

    #[test]
    fn blank_name_is_rejected() {
        let db = WorkoutDb::open_memory().unwrap();
        assert!(matches!(
            db.create_workout(NewWorkout::named(" ")),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn corrupt_blocks_are_reported() {
        let db = WorkoutDb::open_memory().unwrap();
        let w = db.create_workout(NewWorkout::named("Bad")).unwrap();
        db.conn()
            .execute(
                "UPDATE workouts SET blocks = 'not json' WHERE id = ?1",
                params![w.id],
            )
            .unwrap();
        assert!(matches!(
            db.get_workout_by_id(&w.id),
            Err(CoreError::Database(DatabaseError::CorruptRecord { .. }))
        ));
    }

    #[test]
    fn file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wodtimer.db");
        let id = {
            let db = WorkoutDb::open_at(&path).unwrap();
            db.create_workout(NewWorkout::named("Murph")).unwrap().id
        };
        let db = WorkoutDb::open_at(&path).unwrap();
        assert_eq!(db.get_workout_by_id(&id).unwrap().unwrap().name, "Murph");
    }
}
