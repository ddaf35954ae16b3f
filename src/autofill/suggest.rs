use std::collections::HashSet;

use super::catalog::{self, CatalogFilter, COVER_TYPES, DEPARTMENTS};
use super::memory::LocalMemory;
use crate::models::{Field, FormData};

/// Case-insensitive substring filter for autocomplete lists. Display only:
/// nothing here decides a match. An empty query keeps the whole pool.
pub fn filter_suggestions(pool: &[String], query: &str) -> Vec<String> {
    let needle = query.trim().to_lowercase();
    let mut seen = HashSet::new();

    pool.iter()
        .filter(|candidate| !candidate.is_empty())
        .filter(|candidate| needle.is_empty() || candidate.to_lowercase().contains(&needle))
        .filter(|candidate| seen.insert(candidate.to_lowercase()))
        .cloned()
        .collect()
}

/// Every candidate the autocomplete for `field` may offer.
pub async fn candidate_pool(
    field: Field,
    form: &FormData,
    filter: Option<&CatalogFilter>,
    memory: &LocalMemory<'_>,
) -> Vec<String> {
    match field {
        Field::DepartmentName => DEPARTMENTS.iter().map(|d| d.to_string()).collect(),
        Field::ReportType => COVER_TYPES.iter().map(|t| t.to_string()).collect(),
        Field::CourseCode => {
            let mut pool = filter.map(catalog::course_codes).unwrap_or_default();
            pool.extend(memory.courses().await.into_iter().map(|c| c.code));
            pool
        }
        Field::CourseTitle => {
            let mut pool = filter.map(catalog::course_titles).unwrap_or_default();
            pool.extend(memory.courses().await.into_iter().map(|c| c.title));
            pool
        }
        Field::ExperimentNo => filter
            .map(|f| catalog::experiment_numbers(&form.course_code, f))
            .unwrap_or_default(),
        Field::StudentName => memory.students().await.into_iter().map(|s| s.name).collect(),
        Field::StudentRoll => memory.students().await.into_iter().map(|s| s.roll).collect(),
        Field::TeacherName => catalog::teacher_names(),
        _ => Vec::new(),
    }
}
