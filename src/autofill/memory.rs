use std::collections::HashMap;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use sqlx::{Pool, Sqlite};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use crate::db::{get_device_value, set_device_value};
use crate::error::AppError;
use crate::models::FormData;

pub const COURSES_KEY: &str = "ruet_cover_courses";
pub const STUDENTS_KEY: &str = "ruet_cover_students";
pub const PAIRINGS_KEY: &str = "ruet_cover_teacher_courses";
pub const FORM_KEY: &str = "ruet_cover_form_data";

pub const DEFAULT_CAP: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedCourse {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedStudent {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub roll: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedPairing {
    pub course_code: String,
    pub teacher_name: String,
}

/// Whole-value string storage, one namespace per browser.
#[rocket::async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), AppError>;
}

/// `device_cache` rows for one browser, identified by its `device_id` cookie.
pub struct DeviceStore {
    pool: Pool<Sqlite>,
    device_id: String,
}

impl DeviceStore {
    pub fn new(pool: Pool<Sqlite>, device_id: impl Into<String>) -> Self {
        Self {
            pool,
            device_id: device_id.into(),
        }
    }
}

#[rocket::async_trait]
impl KeyValueStore for DeviceStore {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        get_device_value(&self.pool, &self.device_id, key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        set_device_value(&self.pool, &self.device_id, key, value).await
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[rocket::async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.values
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Remembered courses, students and teacher pairings for one browser.
///
/// Each list is bounded to `cap` entries. Writing an entry moves it to the
/// most-recent end, and the oldest entries fall off first. Anything that
/// cannot be read back (storage failure or malformed JSON) reads as empty.
#[derive(Clone, Copy)]
pub struct LocalMemory<'a> {
    store: &'a dyn KeyValueStore,
    cap: usize,
}

impl<'a> LocalMemory<'a> {
    pub fn new(store: &'a dyn KeyValueStore, cap: usize) -> Self {
        Self {
            store,
            cap: cap.max(1),
        }
    }

    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!(key = %key, error = %err, "Local memory unavailable, treating as empty");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                debug!(key = %key, error = %err, "Ignoring malformed local memory");
                None
            }
        }
    }

    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), AppError> {
        let raw = serde_json::to_string(value)
            .map_err(|e| AppError::Internal(format!("Failed to encode {}: {}", key, e)))?;
        self.store.set(key, &raw).await
    }

    async fn read_list<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        self.read_json(key).await.unwrap_or_default()
    }

    pub async fn courses(&self) -> Vec<SavedCourse> {
        self.read_list(COURSES_KEY).await
    }

    pub async fn students(&self) -> Vec<SavedStudent> {
        self.read_list(STUDENTS_KEY).await
    }

    pub async fn pairings(&self) -> Vec<SavedPairing> {
        self.read_list(PAIRINGS_KEY).await
    }

    pub async fn form_snapshot(&self) -> Option<FormData> {
        self.read_json(FORM_KEY).await
    }

    #[instrument(skip(self))]
    pub async fn remember_course(&self, code: &str, title: &str) -> Result<(), AppError> {
        if code.is_empty() && title.is_empty() {
            return Ok(());
        }

        let mut courses = self.courses().await;
        let key = code.to_lowercase();
        upsert(
            &mut courses,
            SavedCourse {
                code: code.to_string(),
                title: title.to_string(),
            },
            |c| c.code.to_lowercase() == key,
            self.cap,
        );

        self.write_json(COURSES_KEY, &courses).await
    }

    #[instrument(skip(self))]
    pub async fn remember_student(&self, name: &str, roll: &str) -> Result<(), AppError> {
        if name.is_empty() && roll.is_empty() {
            return Ok(());
        }

        let mut students = self.students().await;
        let key = roll.to_lowercase();
        upsert(
            &mut students,
            SavedStudent {
                name: name.to_string(),
                roll: roll.to_string(),
            },
            |s| !s.roll.is_empty() && s.roll.to_lowercase() == key,
            self.cap,
        );

        self.write_json(STUDENTS_KEY, &students).await
    }

    #[instrument(skip(self))]
    pub async fn remember_pairing(&self, course_code: &str, teacher_name: &str) -> Result<(), AppError> {
        if course_code.is_empty() || teacher_name.is_empty() {
            return Ok(());
        }

        let mut pairings = self.pairings().await;
        let key = course_code.to_lowercase();
        upsert(
            &mut pairings,
            SavedPairing {
                course_code: course_code.to_string(),
                teacher_name: teacher_name.to_string(),
            },
            |p| p.course_code.to_lowercase() == key,
            self.cap,
        );

        self.write_json(PAIRINGS_KEY, &pairings).await
    }

    /// Stores the in-progress form. A completely blank form is not written.
    pub async fn save_form_snapshot(&self, form: &FormData) -> Result<bool, AppError> {
        if form.is_blank() {
            return Ok(false);
        }
        self.write_json(FORM_KEY, form).await?;
        Ok(true)
    }

    pub async fn title_for_code(&self, code: &str) -> Option<String> {
        if code.is_empty() {
            return None;
        }
        let wanted = code.to_lowercase();
        self.courses()
            .await
            .into_iter()
            .find(|c| c.code.to_lowercase() == wanted)
            .map(|c| c.title)
            .filter(|t| !t.is_empty())
    }

    pub async fn code_for_title(&self, title: &str) -> Option<String> {
        if title.is_empty() {
            return None;
        }
        let wanted = title.to_lowercase();
        self.courses()
            .await
            .into_iter()
            .find(|c| c.title.to_lowercase() == wanted)
            .map(|c| c.code)
            .filter(|c| !c.is_empty())
    }

    pub async fn student_by_name(&self, name: &str) -> Option<SavedStudent> {
        if name.is_empty() {
            return None;
        }
        let wanted = name.to_lowercase();
        self.students()
            .await
            .into_iter()
            .find(|s| !s.name.is_empty() && s.name.to_lowercase() == wanted)
    }

    pub async fn student_by_roll(&self, roll: &str) -> Option<SavedStudent> {
        if roll.is_empty() {
            return None;
        }
        let wanted = roll.to_lowercase();
        self.students()
            .await
            .into_iter()
            .find(|s| !s.roll.is_empty() && s.roll.to_lowercase() == wanted)
    }

    pub async fn teacher_for_course(&self, course_code: &str) -> Option<String> {
        if course_code.is_empty() {
            return None;
        }
        let wanted = course_code.to_lowercase();
        self.pairings()
            .await
            .into_iter()
            .find(|p| p.course_code.to_lowercase() == wanted)
            .map(|p| p.teacher_name)
    }
}

fn upsert<T>(list: &mut Vec<T>, entry: T, same_key: impl Fn(&T) -> bool, cap: usize) {
    list.retain(|existing| !same_key(existing));
    list.push(entry);
    if list.len() > cap {
        let overflow = list.len() - cap;
        list.drain(..overflow);
    }
}

