use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const DEPARTMENTS: [&str; 12] = [
    "Electrical & Electronic Engineering (EEE)",
    "Computer Science & Engineering (CSE)",
    "Mechanical Engineering (ME)",
    "Civil Engineering (CE)",
    "Electronics & Telecommunication Engineering (ETE)",
    "Industrial & Production Engineering (IPE)",
    "Glass & Ceramic Engineering (GCE)",
    "Mechatronics Engineering (MTE)",
    "Electrical & Computer Engineering (ECE)",
    "Chemical Engineering (ChE)",
    "Materials Science & Engineering (MSE)",
    "Building Engineering & Construction Management (BECM)",
];

pub const COVER_TYPES: [&str; 2] = ["LAB Report", "Assignment"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentRecord {
    pub no: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRecord {
    pub course_code: String,
    pub course_title: String,
    pub department: String,
    pub series: String,
    pub section: String,
    pub experiments: Vec<ExperimentRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherRecord {
    pub name: String,
    pub designation: String,
    pub department: String,
}

static COURSES: Lazy<Vec<CourseRecord>> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../data/courses.json"))
        .expect("bundled course catalog is valid JSON")
});

static TEACHERS: Lazy<Vec<TeacherRecord>> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../data/teachers.json"))
        .expect("bundled teacher catalog is valid JSON")
});

static DEPARTMENT_ABBR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([^)]+)\)").expect("department pattern compiles"));

pub fn courses() -> &'static [CourseRecord] {
    &COURSES
}

pub fn teachers() -> &'static [TeacherRecord] {
    &TEACHERS
}

/// "Electrical & Electronic Engineering (EEE)" -> "EEE"
pub fn department_abbreviation(full_name: &str) -> Option<String> {
    DEPARTMENT_ABBR
        .captures(full_name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|abbr| !abbr.is_empty())
}

/// The (department, series, section) triple that scopes catalog lookups.
/// Only constructed when all three parts are known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogFilter {
    pub department: String,
    pub series: String,
    pub section: String,
}

impl CatalogFilter {
    pub fn complete(
        department: Option<&str>,
        series: Option<&str>,
        section: Option<&str>,
    ) -> Option<Self> {
        let department = department.map(str::trim).filter(|s| !s.is_empty())?;
        let series = series.map(str::trim).filter(|s| !s.is_empty())?;
        let section = section.map(str::trim).filter(|s| !s.is_empty())?;

        Some(Self {
            department: department.to_string(),
            series: series.to_string(),
            section: section.to_string(),
        })
    }

    pub fn matches(&self, course: &CourseRecord) -> bool {
        course.department == self.department
            && course.series == self.series
            && course.section.eq_ignore_ascii_case(&self.section)
    }
}

fn scoped(filter: &CatalogFilter) -> impl Iterator<Item = &'static CourseRecord> + '_ {
    courses().iter().filter(move |c| filter.matches(c))
}

fn squash(code: &str) -> String {
    code.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

pub fn course_codes(filter: &CatalogFilter) -> Vec<String> {
    scoped(filter).map(|c| c.course_code.clone()).collect()
}

pub fn course_titles(filter: &CatalogFilter) -> Vec<String> {
    scoped(filter).map(|c| c.course_title.clone()).collect()
}

/// Case-insensitive, whitespace-insensitive match ("eee3100" finds "EEE 3100").
pub fn find_course_by_code(code: &str, filter: &CatalogFilter) -> Option<&'static CourseRecord> {
    if code.trim().is_empty() {
        return None;
    }
    let wanted = squash(code);
    scoped(filter).find(|c| squash(&c.course_code) == wanted)
}

pub fn find_course_by_title(title: &str, filter: &CatalogFilter) -> Option<&'static CourseRecord> {
    if title.trim().is_empty() {
        return None;
    }
    let wanted = title.to_lowercase();
    scoped(filter).find(|c| c.course_title.to_lowercase() == wanted)
}

pub fn experiment_numbers(code: &str, filter: &CatalogFilter) -> Vec<String> {
    find_course_by_code(code, filter)
        .map(|c| c.experiments.iter().map(|e| e.no.clone()).collect())
        .unwrap_or_default()
}

pub fn find_experiment_name(
    code: &str,
    experiment_no: &str,
    filter: &CatalogFilter,
) -> Option<String> {
    let course = find_course_by_code(code, filter)?;
    if experiment_no.trim().is_empty() {
        return None;
    }
    let wanted = normalize_experiment_no(experiment_no);
    course
        .experiments
        .iter()
        .find(|e| normalize_experiment_no(&e.no) == wanted)
        .map(|e| e.name.clone())
}

/// Leading digits as an integer, the way a browser's `parseInt` reads them.
fn leading_number(value: &str) -> Option<u64> {
    let digits: String = value
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// "01" -> "1", "10" -> "10"
pub fn normalize_experiment_no(value: &str) -> String {
    match leading_number(value) {
        Some(n) => n.to_string(),
        None => value.trim().to_string(),
    }
}

/// "1" -> "01", "10" -> "10"; non-numeric input is returned untouched.
pub fn pad_experiment_no(value: &str) -> String {
    match leading_number(value) {
        Some(n) => format!("{:02}", n),
        None => value.to_string(),
    }
}

pub fn teacher_names() -> Vec<String> {
    teachers().iter().map(|t| t.name.clone()).collect()
}

pub fn find_teacher(name: &str) -> Option<&'static TeacherRecord> {
    if name.trim().is_empty() {
        return None;
    }
    let wanted = name.to_lowercase();
    teachers().iter().find(|t| t.name.to_lowercase() == wanted)
}
