use rocket::serde::json::Json;

use crate::autofill::catalog::{
    self, COVER_TYPES, CatalogFilter, CourseRecord, DEPARTMENTS, TeacherRecord,
};

#[get("/catalog/departments")]
pub async fn api_departments() -> Json<Vec<&'static str>> {
    Json(DEPARTMENTS.to_vec())
}

#[get("/catalog/cover-types")]
pub async fn api_cover_types() -> Json<Vec<&'static str>> {
    Json(COVER_TYPES.to_vec())
}

#[get("/catalog/teachers")]
pub async fn api_teachers() -> Json<Vec<TeacherRecord>> {
    Json(catalog::teachers().to_vec())
}

/// Courses visible under a complete filter. `department` may be the full
/// department name or its abbreviation; anything incomplete lists nothing.
#[get("/catalog/courses?<department>&<series>&<section>")]
pub async fn api_courses(
    department: Option<String>,
    series: Option<String>,
    section: Option<String>,
) -> Json<Vec<CourseRecord>> {
    let department = department.map(|d| catalog::department_abbreviation(&d).unwrap_or(d));

    let Some(filter) =
        CatalogFilter::complete(department.as_deref(), series.as_deref(), section.as_deref())
    else {
        return Json(Vec::new());
    };

    Json(
        catalog::courses()
            .iter()
            .filter(|course| filter.matches(course))
            .cloned()
            .collect(),
    )
}
