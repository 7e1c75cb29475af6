//! SQLite implementation of the habit storage interface
//!
//! This module provides the concrete SQLite implementation for storing and
//! retrieving tracker data. It handles all SQL queries and data conversion.

use std::path::PathBuf;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Type, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Params, Row};
use serde::de::DeserializeOwned;

use crate::domain::{
    Achievement, ChatMessage, ChatRole, DailyEntry, DateKey, GoalId, Goal, GoalPeriod, Habit,
    HabitId, MessageId, Progression, Streak, StreakType, Subtask, SubtaskId, Tag, Tier, UserId,
};
use crate::storage::{migrations, HabitStorage, StorageError};

/// Stores a UUID newtype as its hyphenated text form
macro_rules! sql_uuid_id {
    ($($name:ident),*) => {$(
        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.to_string()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                $name::from_string(value.as_str()?).map_err(|e| FromSqlError::Other(Box::new(e)))
            }
        }
    )*};
}

sql_uuid_id!(HabitId, SubtaskId, GoalId, MessageId);

/// Stores a small enum as its canonical name
macro_rules! sql_text_enum {
    ($($name:ident),*) => {$(
        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }
    )*};
}

sql_text_enum!(Tag, Tier, GoalPeriod, ChatRole, StreakType);

impl FromSql for Tag {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Tag::parse(value.as_str()?).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl FromSql for GoalPeriod {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        GoalPeriod::parse(value.as_str()?).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl FromSql for Tier {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Tier::parse(value.as_str()?).ok_or(FromSqlError::InvalidType)
    }
}

impl FromSql for ChatRole {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        ChatRole::parse(value.as_str()?).ok_or(FromSqlError::InvalidType)
    }
}

impl FromSql for StreakType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        StreakType::parse(value.as_str()?).ok_or(FromSqlError::InvalidType)
    }
}

impl ToSql for DateKey {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_string()))
    }
}

impl FromSql for DateKey {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        DateKey::parse(value.as_str()?).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for UserId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for UserId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Ok(UserId::new(value.as_str()?))
    }
}

const HABIT_COLUMNS: &str = "id, user_id, name, emoji, tags, sort_order, is_active, \
    difficulty_rating, ai_analysis, last_analyzed, created_at, created_on, level, experience, \
    experience_to_next, streak, longest_streak, completion_rate, total_completions, tier, badges, \
    last_completed, last_decay_at, pending_grant";

const SUBTASK_COLUMNS: &str = "id, habit_id, user_id, title, sort_order, is_active, created_at";

const ENTRY_COLUMNS: &str = "user_id, date, habit_completions, subtask_completions, \
    punctuality_score, adherence_score, manual_scores, notes, is_completed, auto_finalized, updated_at";

/// SQLite-based storage implementation
///
/// This struct holds a connection to the SQLite database and implements
/// all the storage operations defined in the HabitStorage trait.
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Open (or create) the database file and bring its schema up to date
    pub fn new(db_path: PathBuf) -> Result<Self, StorageError> {
        let conn = Connection::open(&db_path)
            .map_err(|e| StorageError::Connection(format!("Failed to open database: {}", e)))?;

        let storage = Self::from_connection(conn)?;
        tracing::info!("SQLite storage initialized at: {:?}", db_path);
        Ok(storage)
    }

    /// A private database that disappears with the value
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::Connection(format!("Failed to open database: {}", e)))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StorageError> {
        // Subtasks cascade with their habit
        conn.execute("PRAGMA foreign_keys = ON", [])
            .map_err(|e| StorageError::Connection(format!("Failed to enable foreign keys: {}", e)))?;

        migrations::initialize_database(&conn)?;
        Ok(Self { conn })
    }

    fn query_rows<T, P: Params>(
        &self,
        sql: &str,
        params: P,
        map: fn(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Vec<T>, StorageError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, map)?;
        Ok(rows.collect::<Result<Vec<T>, _>>()?)
    }

    fn query_optional<T, P: Params>(
        &self,
        sql: &str,
        params: P,
        map: fn(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Option<T>, StorageError> {
        Ok(self.conn.query_row(sql, params, map).optional()?)
    }

    /// Shared by insert and update; both statements use the same positions
    fn write_habit(&self, sql: &str, habit: &Habit) -> Result<usize, StorageError> {
        let p = &habit.progress;
        let tags = serde_json::to_string(&habit.tags)?;
        let badges = serde_json::to_string(&p.badges)?;
        let pending_grant = habit
            .pending_grant
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let rows = self.conn.execute(
            sql,
            params![
                habit.id,
                habit.user_id,
                habit.name,
                habit.emoji,
                tags,
                habit.order,
                habit.is_active,
                habit.difficulty_rating,
                habit.ai_analysis,
                habit.last_analyzed,
                habit.created_at,
                habit.created_on,
                p.level,
                to_sql_int(p.experience),
                to_sql_int(p.experience_to_next),
                p.streak,
                p.longest_streak,
                p.completion_rate,
                p.total_completions,
                p.tier,
                badges,
                p.last_completed,
                p.last_decay_at,
                pending_grant,
            ],
        )?;
        Ok(rows)
    }
}

impl HabitStorage for SqliteStorage {
    fn create_habit(&self, habit: &Habit) -> Result<(), StorageError> {
        let sql = format!(
            "INSERT INTO habits ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, \
             ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24)",
            HABIT_COLUMNS
        );
        self.write_habit(&sql, habit)?;

        tracing::debug!("Created habit: {} ({})", habit.name, habit.id);
        Ok(())
    }

    fn find_habit(&self, user_id: &UserId, habit_id: &HabitId) -> Result<Option<Habit>, StorageError> {
        let sql = format!("SELECT {} FROM habits WHERE id = ?1 AND user_id = ?2", HABIT_COLUMNS);
        self.query_optional(&sql, params![habit_id, user_id], habit_from_row)
    }

    fn update_habit(&self, habit: &Habit) -> Result<(), StorageError> {
        let rows_affected = self.write_habit(
            "UPDATE habits SET
                name = ?3, emoji = ?4, tags = ?5, sort_order = ?6, is_active = ?7,
                difficulty_rating = ?8, ai_analysis = ?9, last_analyzed = ?10, created_at = ?11,
                created_on = ?12, level = ?13, experience = ?14, experience_to_next = ?15,
                streak = ?16, longest_streak = ?17, completion_rate = ?18, total_completions = ?19,
                tier = ?20, badges = ?21, last_completed = ?22, last_decay_at = ?23,
                pending_grant = ?24
             WHERE id = ?1 AND user_id = ?2",
            habit,
        )?;

        if rows_affected == 0 {
            return Err(StorageError::HabitNotFound {
                habit_id: habit.id.to_string(),
            });
        }

        tracing::debug!("Updated habit: {} ({})", habit.name, habit.id);
        Ok(())
    }

    fn delete_habit(&self, user_id: &UserId, habit_id: &HabitId) -> Result<(), StorageError> {
        let rows_affected = self.conn.execute(
            "DELETE FROM habits WHERE id = ?1 AND user_id = ?2",
            params![habit_id, user_id],
        )?;

        if rows_affected == 0 {
            return Err(StorageError::HabitNotFound {
                habit_id: habit_id.to_string(),
            });
        }

        tracing::debug!("Deleted habit: {}", habit_id);
        Ok(())
    }

    fn list_habits(&self, user_id: &UserId, active_only: bool) -> Result<Vec<Habit>, StorageError> {
        let sql = format!(
            "SELECT {} FROM habits
             WHERE user_id = ?1 AND (?2 = 0 OR is_active = 1)
             ORDER BY sort_order ASC, created_at ASC",
            HABIT_COLUMNS
        );
        self.query_rows(&sql, params![user_id, active_only], habit_from_row)
    }

    fn create_subtask(&self, subtask: &Subtask) -> Result<(), StorageError> {
        self.conn.execute(
            &format!(
                "INSERT INTO subtasks ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                SUBTASK_COLUMNS
            ),
            params![
                subtask.id,
                subtask.habit_id,
                subtask.user_id,
                subtask.title,
                subtask.order,
                subtask.is_active,
                subtask.created_at,
            ],
        )?;

        tracing::debug!("Created subtask {} for habit {}", subtask.id, subtask.habit_id);
        Ok(())
    }

    fn find_subtask(
        &self,
        user_id: &UserId,
        subtask_id: &SubtaskId,
    ) -> Result<Option<Subtask>, StorageError> {
        let sql = format!("SELECT {} FROM subtasks WHERE id = ?1 AND user_id = ?2", SUBTASK_COLUMNS);
        self.query_optional(&sql, params![subtask_id, user_id], subtask_from_row)
    }

    fn update_subtask(&self, subtask: &Subtask) -> Result<(), StorageError> {
        let rows_affected = self.conn.execute(
            "UPDATE subtasks SET title = ?3, sort_order = ?4, is_active = ?5
             WHERE id = ?1 AND user_id = ?2",
            params![
                subtask.id,
                subtask.user_id,
                subtask.title,
                subtask.order,
                subtask.is_active,
            ],
        )?;

        if rows_affected == 0 {
            return Err(StorageError::SubtaskNotFound {
                subtask_id: subtask.id.to_string(),
            });
        }
        Ok(())
    }

    fn list_subtasks(
        &self,
        user_id: &UserId,
        habit_id: Option<&HabitId>,
        active_only: bool,
    ) -> Result<Vec<Subtask>, StorageError> {
        let sql = format!(
            "SELECT {} FROM subtasks
             WHERE user_id = ?1 AND (?2 IS NULL OR habit_id = ?2) AND (?3 = 0 OR is_active = 1)
             ORDER BY habit_id, sort_order ASC, created_at ASC",
            SUBTASK_COLUMNS
        );
        self.query_rows(&sql, params![user_id, habit_id, active_only], subtask_from_row)
    }

    fn find_entry(&self, user_id: &UserId, date: DateKey) -> Result<Option<DailyEntry>, StorageError> {
        let sql = format!(
            "SELECT {} FROM daily_entries WHERE user_id = ?1 AND date = ?2",
            ENTRY_COLUMNS
        );
        self.query_optional(&sql, params![user_id, date], entry_from_row)
    }

    fn save_entry(&self, entry: &DailyEntry) -> Result<(), StorageError> {
        let habit_completions = serde_json::to_string(&entry.habit_completions)?;
        let subtask_completions = serde_json::to_string(&entry.subtask_completions)?;

        self.conn.execute(
            &format!(
                "INSERT OR REPLACE INTO daily_entries ({})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                ENTRY_COLUMNS
            ),
            params![
                entry.user_id,
                entry.date,
                habit_completions,
                subtask_completions,
                entry.punctuality_score,
                entry.adherence_score,
                entry.manual_scores,
                entry.notes,
                entry.is_completed,
                entry.auto_finalized,
                entry.updated_at,
            ],
        )?;

        tracing::debug!("Saved daily entry {} for user {}", entry.date, entry.user_id);
        Ok(())
    }

    fn list_entries(
        &self,
        user_id: &UserId,
        start: DateKey,
        end: DateKey,
    ) -> Result<Vec<DailyEntry>, StorageError> {
        // Date keys are zero padded, so text order is calendar order
        let sql = format!(
            "SELECT {} FROM daily_entries
             WHERE user_id = ?1 AND date BETWEEN ?2 AND ?3
             ORDER BY date ASC",
            ENTRY_COLUMNS
        );
        self.query_rows(&sql, params![user_id, start, end], entry_from_row)
    }

    fn list_all_entries(&self, user_id: &UserId) -> Result<Vec<DailyEntry>, StorageError> {
        let sql = format!(
            "SELECT {} FROM daily_entries WHERE user_id = ?1 ORDER BY date ASC",
            ENTRY_COLUMNS
        );
        self.query_rows(&sql, params![user_id], entry_from_row)
    }

    fn list_open_entries_before(
        &self,
        user_id: &UserId,
        date: DateKey,
    ) -> Result<Vec<DailyEntry>, StorageError> {
        let sql = format!(
            "SELECT {} FROM daily_entries
             WHERE user_id = ?1 AND date < ?2 AND is_completed = 0
             ORDER BY date ASC",
            ENTRY_COLUMNS
        );
        self.query_rows(&sql, params![user_id, date], entry_from_row)
    }

    fn find_streak(
        &self,
        user_id: &UserId,
        streak_type: StreakType,
    ) -> Result<Option<Streak>, StorageError> {
        self.query_optional(
            "SELECT user_id, streak_type, current_streak, longest_streak, last_active_date
             FROM streaks WHERE user_id = ?1 AND streak_type = ?2",
            params![user_id, streak_type],
            |row| {
                Ok(Streak {
                    user_id: row.get(0)?,
                    streak_type: row.get(1)?,
                    current_streak: row.get(2)?,
                    longest_streak: row.get(3)?,
                    last_active_date: row.get(4)?,
                })
            },
        )
    }

    fn save_streak(&self, streak: &Streak) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO streaks (
                user_id, streak_type, current_streak, longest_streak, last_active_date
            ) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                streak.user_id,
                streak.streak_type,
                streak.current_streak,
                streak.longest_streak,
                streak.last_active_date,
            ],
        )?;

        tracing::debug!("Updated {} streak for user {}", streak.streak_type.as_str(), streak.user_id);
        Ok(())
    }

    fn unlock_achievement(&self, achievement: &Achievement) -> Result<bool, StorageError> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO achievements (user_id, achievement_id, unlocked_at)
             VALUES (?1, ?2, ?3)",
            params![achievement.user_id, achievement.id, achievement.unlocked_at],
        )?;
        Ok(inserted == 1)
    }

    fn list_achievements(&self, user_id: &UserId) -> Result<Vec<Achievement>, StorageError> {
        self.query_rows(
            "SELECT achievement_id, user_id, unlocked_at FROM achievements
             WHERE user_id = ?1 ORDER BY unlocked_at ASC",
            params![user_id],
            |row| {
                Ok(Achievement {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    unlocked_at: row.get(2)?,
                })
            },
        )
    }

    fn create_goal(&self, goal: &Goal) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO goals (id, user_id, tag, period, target_count, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![goal.id, goal.user_id, goal.tag, goal.period, goal.target_count, goal.created_at],
        )?;

        tracing::debug!("Created {} goal for tag {}", goal.period.as_str(), goal.tag);
        Ok(())
    }

    fn list_goals(&self, user_id: &UserId) -> Result<Vec<Goal>, StorageError> {
        self.query_rows(
            "SELECT id, user_id, tag, period, target_count, created_at FROM goals
             WHERE user_id = ?1 ORDER BY created_at ASC",
            params![user_id],
            |row| {
                Ok(Goal {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    tag: row.get(2)?,
                    period: row.get(3)?,
                    target_count: row.get(4)?,
                    created_at: row.get(5)?,
                })
            },
        )
    }

    fn append_chat_message(&self, message: &ChatMessage) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO chat_messages (id, user_id, role, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                message.id,
                message.user_id,
                message.role,
                message.content,
                message.created_at,
            ],
        )?;
        Ok(())
    }

    fn recent_chat_messages(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<ChatMessage>, StorageError> {
        let mut messages = self.query_rows(
            "SELECT id, user_id, role, content, created_at FROM chat_messages
             WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2",
            params![user_id, limit],
            |row| {
                Ok(ChatMessage {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    role: row.get(2)?,
                    content: row.get(3)?,
                    created_at: row.get(4)?,
                })
            },
        )?;
        messages.reverse();
        Ok(messages)
    }

    fn reset_user_data(&self, user_id: &UserId) -> Result<(), StorageError> {
        let tx = self.conn.unchecked_transaction()?;
        for table in [
            "subtasks",
            "habits",
            "daily_entries",
            "streaks",
            "achievements",
            "goals",
            "chat_messages",
        ] {
            tx.execute(&format!("DELETE FROM {} WHERE user_id = ?1", table), params![user_id])?;
        }
        tx.commit()?;

        tracing::info!("Reset all data for user {}", user_id);
        Ok(())
    }
}

fn habit_from_row(row: &Row<'_>) -> rusqlite::Result<Habit> {
    Ok(Habit {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        emoji: row.get(3)?,
        tags: json_column(row, 4)?,
        order: row.get(5)?,
        is_active: row.get(6)?,
        difficulty_rating: row.get(7)?,
        ai_analysis: row.get(8)?,
        last_analyzed: row.get(9)?,
        created_at: row.get(10)?,
        created_on: row.get(11)?,
        progress: Progression {
            level: row.get(12)?,
            experience: u64_column(row, 13)?,
            experience_to_next: u64_column(row, 14)?,
            streak: row.get(15)?,
            longest_streak: row.get(16)?,
            completion_rate: row.get(17)?,
            total_completions: row.get(18)?,
            tier: row.get(19)?,
            badges: json_column(row, 20)?,
            last_completed: row.get(21)?,
            last_decay_at: row.get(22)?,
        },
        pending_grant: row
            .get::<_, Option<String>>(23)?
            .map(|raw| parse_json(23, &raw))
            .transpose()?,
    })
}

fn subtask_from_row(row: &Row<'_>) -> rusqlite::Result<Subtask> {
    Ok(Subtask {
        id: row.get(0)?,
        habit_id: row.get(1)?,
        user_id: row.get(2)?,
        title: row.get(3)?,
        order: row.get(4)?,
        is_active: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<DailyEntry> {
    Ok(DailyEntry {
        user_id: row.get(0)?,
        date: row.get(1)?,
        habit_completions: json_column(row, 2)?,
        subtask_completions: json_column(row, 3)?,
        punctuality_score: row.get(4)?,
        adherence_score: row.get(5)?,
        manual_scores: row.get(6)?,
        notes: row.get(7)?,
        is_completed: row.get(8)?,
        auto_finalized: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    parse_json(idx, &raw)
}

fn parse_json<T: DeserializeOwned>(idx: usize, raw: &str) -> rusqlite::Result<T> {
    serde_json::from_str(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// SQLite integers are signed; counters saturate instead of wrapping
fn to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn u64_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<u64> {
    let value: i64 = row.get(idx)?;
    u64::try_from(value)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Badge, CompletionGrant, Tag};

    fn storage() -> SqliteStorage {
        SqliteStorage::in_memory().unwrap()
    }

    fn key(s: &str) -> DateKey {
        DateKey::parse(s).unwrap()
    }

    fn habit(user: &str, name: &str) -> Habit {
        Habit::new(UserId::new(user), name.to_string(), None, vec![Tag::Str, Tag::Vit], Some(4), key("2024-05-01"))
            .unwrap()
    }

    #[test]
    fn test_habit_round_trip_with_progress() {
        let storage = storage();
        let mut h = habit("u1", "Pushups");
        h.progress.badges.insert(Badge::FirstCompletion);
        h.progress.last_completed = Some(key("2024-05-02"));
        h.pending_grant = Some(CompletionGrant {
            date: key("2024-05-02"),
            experience_granted: 28,
            before: Progression::starting(140),
        });
        storage.create_habit(&h).unwrap();

        let loaded = storage.get_habit(&h.user_id, &h.id).unwrap();
        assert_eq!(loaded.tags, h.tags);
        assert_eq!(loaded.progress, h.progress);
        assert_eq!(loaded.pending_grant, h.pending_grant);
        assert_eq!(loaded.created_on, h.created_on);
    }

    #[test]
    fn test_rows_are_scoped_by_user() {
        let storage = storage();
        let h = habit("u1", "Pushups");
        storage.create_habit(&h).unwrap();

        let other = UserId::new("u2");
        assert!(storage.find_habit(&other, &h.id).unwrap().is_none());
        assert!(storage.list_habits(&other, false).unwrap().is_empty());
        assert!(matches!(
            storage.delete_habit(&other, &h.id),
            Err(StorageError::HabitNotFound { .. })
        ));
    }

    #[test]
    fn test_delete_cascades_to_subtasks() {
        let storage = storage();
        let h = habit("u1", "Workout");
        storage.create_habit(&h).unwrap();
        let s = Subtask::new(h.user_id.clone(), h.id, "Squats".to_string(), 0).unwrap();
        storage.create_subtask(&s).unwrap();

        storage.delete_habit(&h.user_id, &h.id).unwrap();
        assert!(storage.find_subtask(&h.user_id, &s.id).unwrap().is_none());
    }

    #[test]
    fn test_entry_upsert_is_last_write_wins() {
        let storage = storage();
        let user = UserId::new("u1");
        let mut entry = DailyEntry::new(user.clone(), key("2024-05-02"));
        entry.notes = "first".to_string();
        storage.save_entry(&entry).unwrap();

        entry.notes = "second".to_string();
        entry.habit_completions.insert(HabitId::new(), true);
        storage.save_entry(&entry).unwrap();

        let loaded = storage.find_entry(&user, key("2024-05-02")).unwrap().unwrap();
        assert_eq!(loaded.notes, "second");
        assert_eq!(loaded.habit_completions, entry.habit_completions);
        assert_eq!(
            storage.list_entries(&user, key("2024-05-01"), key("2024-05-31")).unwrap().len(),
            1
        );
    }

    #[test]
    fn test_achievement_unlock_is_idempotent() {
        let storage = storage();
        let a = Achievement {
            id: "streak_3".to_string(),
            user_id: UserId::new("u1"),
            unlocked_at: chrono::Utc::now(),
        };
        assert!(storage.unlock_achievement(&a).unwrap());
        assert!(!storage.unlock_achievement(&a).unwrap());
        assert_eq!(storage.list_achievements(&a.user_id).unwrap().len(), 1);
    }

    #[test]
    fn test_recent_chat_messages_in_order() {
        let storage = storage();
        let user = UserId::new("u1");
        for text in ["one", "two", "three"] {
            let msg = ChatMessage::new(user.clone(), ChatRole::User, text.to_string()).unwrap();
            storage.append_chat_message(&msg).unwrap();
        }

        let recent = storage.recent_chat_messages(&user, 2).unwrap();
        let contents: Vec<&str> = recent.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["two", "three"]);
    }

    #[test]
    fn test_reset_only_touches_one_user() {
        let storage = storage();
        let mine = habit("u1", "Mine");
        let theirs = habit("u2", "Theirs");
        storage.create_habit(&mine).unwrap();
        storage.create_habit(&theirs).unwrap();

        storage.reset_user_data(&mine.user_id).unwrap();
        assert!(storage.list_habits(&mine.user_id, false).unwrap().is_empty());
        assert_eq!(storage.list_habits(&theirs.user_id, false).unwrap().len(), 1);
    }
}
