#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use crate::autofill::memory::{
        COURSES_KEY, DeviceStore, FORM_KEY, InMemoryStore, KeyValueStore, LocalMemory,
        PAIRINGS_KEY, STUDENTS_KEY, SavedCourse,
    };
    use crate::db::clean_stale_device_cache;
    use crate::models::FormData;
    use crate::test::test_db::TestDbBuilder;

    #[rocket::async_test]
    async fn test_course_round_trip_any_case() {
        let store = InMemoryStore::new();
        let memory = LocalMemory::new(&store, 100);

        memory
            .remember_course("CSE 2101", "Data Structures")
            .await
            .expect("remember course");

        assert_eq!(
            memory.title_for_code("cse 2101").await.as_deref(),
            Some("Data Structures")
        );
        assert_eq!(
            memory.title_for_code("CSE 2101").await.as_deref(),
            Some("Data Structures")
        );
        assert_eq!(
            memory.code_for_title("DATA STRUCTURES").await.as_deref(),
            Some("CSE 2101")
        );
    }

    #[rocket::async_test]
    async fn test_course_upsert_replaces_and_moves_to_end() {
        let store = InMemoryStore::new();
        let memory = LocalMemory::new(&store, 100);

        memory.remember_course("A 1", "First").await.unwrap();
        memory.remember_course("B 2", "Second").await.unwrap();
        memory.remember_course("a 1", "First, renamed").await.unwrap();

        let courses = memory.courses().await;
        assert_eq!(
            courses,
            vec![
                SavedCourse {
                    code: "B 2".to_string(),
                    title: "Second".to_string()
                },
                SavedCourse {
                    code: "a 1".to_string(),
                    title: "First, renamed".to_string()
                },
            ]
        );
    }

    #[rocket::async_test]
    async fn test_lists_are_capped_oldest_first() {
        let store = InMemoryStore::new();
        let memory = LocalMemory::new(&store, 3);

        for n in 1..=5 {
            memory
                .remember_course(&format!("C {}", n), &format!("Course {}", n))
                .await
                .unwrap();
        }

        let codes: Vec<String> = memory.courses().await.into_iter().map(|c| c.code).collect();
        assert_eq!(codes, vec!["C 3", "C 4", "C 5"]);
        assert!(memory.title_for_code("C 1").await.is_none());
    }

    #[rocket::async_test]
    async fn test_empty_pairs_are_not_remembered() {
        let store = InMemoryStore::new();
        let memory = LocalMemory::new(&store, 100);

        memory.remember_course("", "").await.unwrap();
        memory.remember_student("", "").await.unwrap();
        memory.remember_pairing("EEE 3100", "").await.unwrap();
        memory.remember_pairing("", "Dr. Someone").await.unwrap();

        assert_eq!(store.get(COURSES_KEY).await.unwrap(), None);
        assert_eq!(store.get(STUDENTS_KEY).await.unwrap(), None);
        assert_eq!(store.get(PAIRINGS_KEY).await.unwrap(), None);
    }

    #[rocket::async_test]
    async fn test_students_are_keyed_by_roll() {
        let store = InMemoryStore::new();
        let memory = LocalMemory::new(&store, 100);

        memory.remember_student("Rahim", "2201059").await.unwrap();
        memory.remember_student("Rahim Uddin", "2201059").await.unwrap();
        memory.remember_student("Karim", "").await.unwrap();
        memory.remember_student("Nobody", "").await.unwrap();

        let students = memory.students().await;
        assert_eq!(students.len(), 3);

        let by_roll = memory.student_by_roll("2201059").await.expect("by roll");
        assert_eq!(by_roll.name, "Rahim Uddin");

        let by_name = memory.student_by_name("KARIM").await.expect("by name");
        assert_eq!(by_name.roll, "");
    }

    #[rocket::async_test]
    async fn test_pairing_keyed_by_lowercase_code() {
        let store = InMemoryStore::new();
        let memory = LocalMemory::new(&store, 100);

        memory
            .remember_pairing("EEE 3100", "Dr. Kazi Khairul Islam")
            .await
            .unwrap();
        memory
            .remember_pairing("eee 3100", "Dr. Muhammad Abdul Goffar Khan")
            .await
            .unwrap();

        assert_eq!(memory.pairings().await.len(), 1);
        assert_eq!(
            memory.teacher_for_course("Eee 3100").await.as_deref(),
            Some("Dr. Muhammad Abdul Goffar Khan")
        );
    }

    #[rocket::async_test]
    async fn test_malformed_json_reads_as_empty() {
        let store = InMemoryStore::new();
        store.set(COURSES_KEY, "{not json").await.unwrap();
        store.set(STUDENTS_KEY, "42").await.unwrap();
        store.set(FORM_KEY, "\"not a form\"").await.unwrap();

        let memory = LocalMemory::new(&store, 100);
        assert!(memory.courses().await.is_empty());
        assert!(memory.students().await.is_empty());
        assert!(memory.form_snapshot().await.is_none());
        assert!(memory.title_for_code("anything").await.is_none());

        // A write after corruption starts a fresh list.
        memory.remember_course("X 1", "Recovered").await.unwrap();
        assert_eq!(memory.courses().await.len(), 1);
    }

    #[rocket::async_test]
    async fn test_blank_form_snapshot_is_not_written() {
        let store = InMemoryStore::new();
        let memory = LocalMemory::new(&store, 100);

        let saved = memory
            .save_form_snapshot(&FormData::default())
            .await
            .unwrap();
        assert!(!saved);
        assert_eq!(store.get(FORM_KEY).await.unwrap(), None);

        let form = FormData {
            course_code: "EEE 3100".to_string(),
            ..FormData::default()
        };
        assert!(memory.save_form_snapshot(&form).await.unwrap());
        assert_eq!(memory.form_snapshot().await, Some(form));
    }

    #[rocket::async_test]
    async fn test_device_store_separates_browsers() {
        let test_db = TestDbBuilder::new().build().await.expect("test db");

        let first = DeviceStore::new(test_db.pool.clone(), "device-one");
        let second = DeviceStore::new(test_db.pool.clone(), "device-two");

        LocalMemory::new(&first, 100)
            .remember_course("EEE 3100", "Electronics Shop Practice")
            .await
            .expect("remember on first device");

        assert_eq!(
            LocalMemory::new(&first, 100)
                .title_for_code("eee 3100")
                .await
                .as_deref(),
            Some("Electronics Shop Practice")
        );
        assert!(LocalMemory::new(&second, 100).courses().await.is_empty());
    }

    #[rocket::async_test]
    async fn test_stale_devices_are_purged_whole() {
        let test_db = TestDbBuilder::new().build().await.unwrap();
        let pool = &test_db.pool;
        let idle = DeviceStore::new(pool.clone(), "idle-device");
        let active = DeviceStore::new(pool.clone(), "active-device");

        idle.set(COURSES_KEY, "[]").await.unwrap();
        idle.set(FORM_KEY, "{}").await.unwrap();
        active.set(COURSES_KEY, "[]").await.unwrap();
        active.set(STUDENTS_KEY, "[]").await.unwrap();

        let long_ago = (Utc::now() - Duration::days(400)).naive_utc();
        sqlx::query("UPDATE device_cache SET updated_at = ? WHERE device_id = ?")
            .bind(long_ago)
            .bind("idle-device")
            .execute(pool)
            .await
            .unwrap();
        // One old key does not make an active browser stale.
        sqlx::query("UPDATE device_cache SET updated_at = ? WHERE device_id = ? AND key = ?")
            .bind(long_ago)
            .bind("active-device")
            .bind(COURSES_KEY)
            .execute(pool)
            .await
            .unwrap();

        let cutoff = (Utc::now() - Duration::days(180)).naive_utc();
        assert_eq!(clean_stale_device_cache(pool, cutoff).await.unwrap(), 2);

        assert!(idle.get(COURSES_KEY).await.unwrap().is_none());
        assert!(idle.get(FORM_KEY).await.unwrap().is_none());
        assert_eq!(active.get(COURSES_KEY).await.unwrap().as_deref(), Some("[]"));
        assert_eq!(active.get(STUDENTS_KEY).await.unwrap().as_deref(), Some("[]"));
        assert_eq!(clean_stale_device_cache(pool, cutoff).await.unwrap(), 0);
    }
}
