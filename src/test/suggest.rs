#[cfg(test)]
mod tests {
    use crate::autofill::catalog::{CatalogFilter, DEPARTMENTS};
    use crate::autofill::memory::{InMemoryStore, LocalMemory};
    use crate::autofill::suggest::{candidate_pool, filter_suggestions};
    use crate::models::{Field, FormData};

    fn pool(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_substring_match_ignores_case() {
        let candidates = pool(&["EEE 3100", "EEE 3106", "CSE 2101"]);
        assert_eq!(filter_suggestions(&candidates, "31"), pool(&["EEE 3100", "EEE 3106"]));
        assert_eq!(filter_suggestions(&candidates, "cse"), pool(&["CSE 2101"]));
        assert!(filter_suggestions(&candidates, "ME").is_empty());
    }

    #[test]
    fn test_empty_query_keeps_pool_without_duplicates() {
        let candidates = pool(&["Alpha", "", "beta", "ALPHA", "Beta"]);
        assert_eq!(filter_suggestions(&candidates, ""), pool(&["Alpha", "beta"]));
        assert_eq!(filter_suggestions(&candidates, "  "), pool(&["Alpha", "beta"]));
    }

    #[rocket::async_test]
    async fn test_course_code_pool_merges_catalog_and_memory() {
        let store = InMemoryStore::new();
        let memory = LocalMemory::new(&store, 100);
        memory.remember_course("EEE 3100", "Electronics Shop Practice").await.unwrap();
        memory.remember_course("MATH 2201", "Mathematics III").await.unwrap();

        let filter = CatalogFilter::complete(Some("EEE"), Some("22"), Some("A"));
        let candidates =
            candidate_pool(Field::CourseCode, &FormData::default(), filter.as_ref(), &memory).await;

        assert_eq!(candidates.first().map(String::as_str), Some("EEE 3100"));
        assert!(candidates.contains(&"MATH 2201".to_string()));

        let shown = filter_suggestions(&candidates, "");
        assert_eq!(
            shown.iter().filter(|c| c.as_str() == "EEE 3100").count(),
            1,
            "catalog and memory copies collapse into one suggestion"
        );
    }

    #[rocket::async_test]
    async fn test_catalog_pools_need_a_filter() {
        let store = InMemoryStore::new();
        let memory = LocalMemory::new(&store, 100);

        let form = FormData {
            course_code: "EEE 3100".to_string(),
            ..FormData::default()
        };

        assert!(candidate_pool(Field::CourseCode, &form, None, &memory).await.is_empty());
        assert!(candidate_pool(Field::ExperimentNo, &form, None, &memory).await.is_empty());

        let filter = CatalogFilter::complete(Some("EEE"), Some("22"), Some("A"));
        let numbers = candidate_pool(Field::ExperimentNo, &form, filter.as_ref(), &memory).await;
        assert_eq!(numbers.len(), 9);
    }

    #[rocket::async_test]
    async fn test_static_pools() {
        let store = InMemoryStore::new();
        let memory = LocalMemory::new(&store, 100);
        let form = FormData::default();

        let departments = candidate_pool(Field::DepartmentName, &form, None, &memory).await;
        assert_eq!(departments.len(), DEPARTMENTS.len());

        let types = candidate_pool(Field::ReportType, &form, None, &memory).await;
        assert_eq!(types, pool(&["LAB Report", "Assignment"]));

        let teachers = candidate_pool(Field::TeacherName, &form, None, &memory).await;
        assert!(teachers.contains(&"Dr. Kazi Khairul Islam".to_string()));

        assert!(candidate_pool(Field::DateOfSubmission, &form, None, &memory).await.is_empty());
    }
}
