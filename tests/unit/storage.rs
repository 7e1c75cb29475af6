use super::*;
use tempfile::NamedTempFile;

fn habit(user: &str) -> Habit {
    Habit::new(UserId::new(user), "Walk".to_string(), Some("🚶".to_string()), vec![Tag::Vit], Some(2), key("2024-05-01"))
        .unwrap()
}

#[test]
fn test_storage_creation() {
    let temp_file = NamedTempFile::new().expect("Failed to create temp file");
    let storage = SqliteStorage::new(temp_file.path().to_path_buf());
    assert!(storage.is_ok());
}

#[test]
fn test_file_storage_survives_reopen() {
    let temp_file = NamedTempFile::new().expect("Failed to create temp file");
    let path = temp_file.path().to_path_buf();
    let walk = habit("u1");

    {
        let storage = SqliteStorage::new(path.clone()).unwrap();
        storage.create_habit(&walk).unwrap();
        let mut entry = DailyEntry::new(walk.user_id.clone(), key("2024-05-01"));
        entry.habit_completions.insert(walk.id, true);
        storage.save_entry(&entry).unwrap();
    }

    let storage = SqliteStorage::new(path).unwrap();
    let loaded = storage.get_habit(&walk.user_id, &walk.id).unwrap();
    assert_eq!(loaded.name, "Walk");
    assert_eq!(loaded.emoji, "🚶");
    assert_eq!(loaded.progress, walk.progress);

    let entry = storage.find_entry(&walk.user_id, key("2024-05-01")).unwrap().unwrap();
    assert!(entry.is_habit_complete(&walk.id));
}

#[test]
fn test_open_entries_before_a_day() {
    let storage = SqliteStorage::in_memory().unwrap();
    let user = UserId::new("u1");
    for day in ["2024-05-01", "2024-05-02", "2024-05-03"] {
        storage.save_entry(&DailyEntry::new(user.clone(), key(day))).unwrap();
    }
    let mut closed = DailyEntry::new(user.clone(), key("2024-04-30"));
    closed.is_completed = true;
    storage.save_entry(&closed).unwrap();

    let open: Vec<String> = storage
        .list_open_entries_before(&user, key("2024-05-03"))
        .unwrap()
        .iter()
        .map(|e| e.date.to_string())
        .collect();
    assert_eq!(open, vec!["2024-05-01", "2024-05-02"]);
}

#[test]
fn test_missing_habit_is_typed() {
    let storage = SqliteStorage::in_memory().unwrap();
    let user = UserId::new("u1");
    assert!(storage.find_habit(&user, &HabitId::new()).unwrap().is_none());
    assert!(matches!(
        storage.get_habit(&user, &HabitId::new()),
        Err(StorageError::HabitNotFound { .. })
    ));
}
