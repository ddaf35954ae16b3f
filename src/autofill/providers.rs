use serde::Serialize;
use sqlx::{Pool, Sqlite};
use tracing::warn;

use super::catalog::{self, CatalogFilter};
use super::memory::LocalMemory;
use crate::db::get_teacher_courses;
use crate::models::TeacherCoursePairing;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Source {
    Catalog,
    LocalMemory,
    RemotePairings,
}

/// One tier of autofill data. Every lookup is optional: a provider that has
/// nothing to say returns `None` and the next provider in the chain is asked.
#[rocket::async_trait]
pub trait LookupProvider: Send + Sync {
    fn source(&self) -> Source;

    async fn course_title_for_code(&self, _code: &str) -> Option<String> {
        None
    }

    async fn course_code_for_title(&self, _title: &str) -> Option<String> {
        None
    }

    async fn teacher_for_course(&self, _course_code: &str) -> Option<String> {
        None
    }
}

/// Bundled course data. Silent unless the catalog filter triple is complete.
pub struct CatalogProvider {
    filter: Option<CatalogFilter>,
}

impl CatalogProvider {
    pub fn new(filter: Option<CatalogFilter>) -> Self {
        Self { filter }
    }
}

#[rocket::async_trait]
impl LookupProvider for CatalogProvider {
    fn source(&self) -> Source {
        Source::Catalog
    }

    async fn course_title_for_code(&self, code: &str) -> Option<String> {
        let filter = self.filter.as_ref()?;
        catalog::find_course_by_code(code, filter).map(|c| c.course_title.clone())
    }

    async fn course_code_for_title(&self, title: &str) -> Option<String> {
        let filter = self.filter.as_ref()?;
        catalog::find_course_by_title(title, filter).map(|c| c.course_code.clone())
    }
}

pub struct LocalMemoryProvider<'a> {
    memory: LocalMemory<'a>,
}

impl<'a> LocalMemoryProvider<'a> {
    pub fn new(memory: LocalMemory<'a>) -> Self {
        Self { memory }
    }
}

#[rocket::async_trait]
impl LookupProvider for LocalMemoryProvider<'_> {
    fn source(&self) -> Source {
        Source::LocalMemory
    }

    async fn course_title_for_code(&self, code: &str) -> Option<String> {
        self.memory.title_for_code(code).await
    }

    async fn course_code_for_title(&self, title: &str) -> Option<String> {
        self.memory.code_for_title(title).await
    }

    async fn teacher_for_course(&self, course_code: &str) -> Option<String> {
        self.memory.teacher_for_course(course_code).await
    }
}

/// The signed-in account's teacher pairings, loaded once per request.
#[derive(Debug, Clone, Default)]
pub struct RemotePairingProvider {
    pairings: Vec<TeacherCoursePairing>,
}

impl RemotePairingProvider {
    pub fn new(pairings: Vec<TeacherCoursePairing>) -> Self {
        Self { pairings }
    }

    /// A failed read leaves the provider empty; pairings only ever help autofill.
    pub async fn load(pool: &Pool<Sqlite>, user_id: i64) -> Self {
        match get_teacher_courses(pool, user_id).await {
            Ok(pairings) => Self::new(pairings),
            Err(err) => {
                warn!(user_id = %user_id, error = %err, "Could not load teacher pairings");
                Self::default()
            }
        }
    }
}

#[rocket::async_trait]
impl LookupProvider for RemotePairingProvider {
    fn source(&self) -> Source {
        Source::RemotePairings
    }

    async fn teacher_for_course(&self, course_code: &str) -> Option<String> {
        if course_code.is_empty() {
            return None;
        }
        let wanted = course_code.to_lowercase();
        self.pairings
            .iter()
            .find(|p| !p.course_code.is_empty() && p.course_code.to_lowercase() == wanted)
            .map(|p| p.teacher_name.clone())
    }
}

/// Providers asked in order; the first answer wins.
pub struct ProviderChain<'a> {
    providers: Vec<&'a dyn LookupProvider>,
}

impl<'a> ProviderChain<'a> {
    pub fn new(providers: Vec<&'a dyn LookupProvider>) -> Self {
        Self { providers }
    }

    pub async fn course_title_for_code(&self, code: &str) -> Option<(Source, String)> {
        for provider in &self.providers {
            if let Some(title) = provider.course_title_for_code(code).await {
                return Some((provider.source(), title));
            }
        }
        None
    }

    pub async fn course_code_for_title(&self, title: &str) -> Option<(Source, String)> {
        for provider in &self.providers {
            if let Some(code) = provider.course_code_for_title(title).await {
                return Some((provider.source(), code));
            }
        }
        None
    }

    pub async fn teacher_for_course(&self, course_code: &str) -> Option<(Source, String)> {
        for provider in &self.providers {
            if let Some(teacher) = provider.teacher_for_course(course_code).await {
                return Some((provider.source(), teacher));
            }
        }
        None
    }
}
