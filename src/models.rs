use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Everything printed on a cover page. All fields are free text and may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormData {
    pub department_name: String,
    pub report_type: String,
    pub course_code: String,
    pub course_title: String,
    pub experiment_no: String,
    pub experiment_name: String,
    pub student_name: String,
    pub student_roll: String,
    pub section: String,
    pub teacher_name: String,
    pub designation: String,
    pub teacher_department: String,
    pub date_of_experiment: String,
    pub date_of_submission: String,
}

impl FormData {
    pub fn is_blank(&self) -> bool {
        Field::ALL.iter().all(|f| f.get(self).trim().is_empty())
    }

    pub fn report_kind(&self) -> ReportType {
        ReportType::from_label(&self.report_type)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportType {
    LabReport,
    Assignment,
}

impl ReportType {
    pub fn from_label(label: &str) -> Self {
        if label.trim().eq_ignore_ascii_case("assignment") {
            ReportType::Assignment
        } else {
            ReportType::LabReport
        }
    }

    pub fn number_label(&self) -> &'static str {
        match self {
            ReportType::LabReport => "Experiment No",
            ReportType::Assignment => "Assignment No",
        }
    }

    pub fn name_label(&self) -> &'static str {
        match self {
            ReportType::LabReport => "Experiment Name",
            ReportType::Assignment => "Assignment Name",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    DepartmentName,
    ReportType,
    CourseCode,
    CourseTitle,
    ExperimentNo,
    ExperimentName,
    StudentName,
    StudentRoll,
    Section,
    TeacherName,
    Designation,
    TeacherDepartment,
    DateOfExperiment,
    DateOfSubmission,
}

impl Field {
    pub const ALL: [Field; 14] = [
        Field::DepartmentName,
        Field::ReportType,
        Field::CourseCode,
        Field::CourseTitle,
        Field::ExperimentNo,
        Field::ExperimentName,
        Field::StudentName,
        Field::StudentRoll,
        Field::Section,
        Field::TeacherName,
        Field::Designation,
        Field::TeacherDepartment,
        Field::DateOfExperiment,
        Field::DateOfSubmission,
    ];

    pub fn get<'a>(&self, form: &'a FormData) -> &'a str {
        match self {
            Field::DepartmentName => &form.department_name,
            Field::ReportType => &form.report_type,
            Field::CourseCode => &form.course_code,
            Field::CourseTitle => &form.course_title,
            Field::ExperimentNo => &form.experiment_no,
            Field::ExperimentName => &form.experiment_name,
            Field::StudentName => &form.student_name,
            Field::StudentRoll => &form.student_roll,
            Field::Section => &form.section,
            Field::TeacherName => &form.teacher_name,
            Field::Designation => &form.designation,
            Field::TeacherDepartment => &form.teacher_department,
            Field::DateOfExperiment => &form.date_of_experiment,
            Field::DateOfSubmission => &form.date_of_submission,
        }
    }

    pub fn set(&self, form: &mut FormData, value: String) {
        let slot = match self {
            Field::DepartmentName => &mut form.department_name,
            Field::ReportType => &mut form.report_type,
            Field::CourseCode => &mut form.course_code,
            Field::CourseTitle => &mut form.course_title,
            Field::ExperimentNo => &mut form.experiment_no,
            Field::ExperimentName => &mut form.experiment_name,
            Field::StudentName => &mut form.student_name,
            Field::StudentRoll => &mut form.student_roll,
            Field::Section => &mut form.section,
            Field::TeacherName => &mut form.teacher_name,
            Field::Designation => &mut form.designation,
            Field::TeacherDepartment => &mut form.teacher_department,
            Field::DateOfExperiment => &mut form.date_of_experiment,
            Field::DateOfSubmission => &mut form.date_of_submission,
        };
        *slot = value;
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::DepartmentName => "departmentName",
            Field::ReportType => "reportType",
            Field::CourseCode => "courseCode",
            Field::CourseTitle => "courseTitle",
            Field::ExperimentNo => "experimentNo",
            Field::ExperimentName => "experimentName",
            Field::StudentName => "studentName",
            Field::StudentRoll => "studentRoll",
            Field::Section => "section",
            Field::TeacherName => "teacherName",
            Field::Designation => "designation",
            Field::TeacherDepartment => "teacherDepartment",
            Field::DateOfExperiment => "dateOfExperiment",
            Field::DateOfSubmission => "dateOfSubmission",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Field::ALL.into_iter().find(|f| f.as_str() == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Member {
    pub name: String,
    pub roll: String,
    pub section: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub members: Vec<Member>,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbGroup {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbMember {
    pub group_id: Option<i64>,
    pub name: Option<String>,
    pub roll: Option<String>,
    pub section: Option<String>,
}

impl From<DbMember> for Member {
    fn from(db: DbMember) -> Self {
        Self {
            name: db.name.unwrap_or_default(),
            roll: db.roll.unwrap_or_default(),
            section: db.section.unwrap_or_default(),
        }
    }
}

impl Group {
    pub fn from_db(db: DbGroup, members: Vec<Member>) -> Self {
        Self {
            id: db.id.unwrap_or_default(),
            name: db.name.unwrap_or_default(),
            members,
            created_at: to_utc(db.created_at),
        }
    }
}

/// Extra tags carried by a history entry that covered a whole group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupTag {
    pub group_id: i64,
    pub group_name: String,
    pub member_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: i64,
    #[serde(flatten)]
    pub form: FormData,
    pub is_group: bool,
    pub group_id: Option<i64>,
    pub group_name: Option<String>,
    pub member_count: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone, Default)]
pub struct DbHistoryEntry {
    pub id: Option<i64>,
    pub form_json: Option<String>,
    pub is_group: Option<bool>,
    pub group_id: Option<i64>,
    pub group_name: Option<String>,
    pub member_count: Option<i64>,
    pub created_at: Option<NaiveDateTime>,
}

impl From<DbHistoryEntry> for HistoryEntry {
    fn from(db: DbHistoryEntry) -> Self {
        // A snapshot that no longer parses still lists, just without field values.
        let form = db
            .form_json
            .as_deref()
            .and_then(|json| serde_json::from_str(json).ok())
            .unwrap_or_default();

        Self {
            id: db.id.unwrap_or_default(),
            form,
            is_group: db.is_group.unwrap_or_default(),
            group_id: db.group_id,
            group_name: db.group_name,
            member_count: db.member_count,
            created_at: to_utc(db.created_at),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherCoursePairing {
    pub course_code: String,
    pub teacher_name: String,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbTeacherCoursePairing {
    pub course_code: Option<String>,
    pub teacher_name: Option<String>,
}

impl From<DbTeacherCoursePairing> for TeacherCoursePairing {
    fn from(db: DbTeacherCoursePairing) -> Self {
        Self {
            course_code: db.course_code.unwrap_or_default(),
            teacher_name: db.teacher_name.unwrap_or_default(),
        }
    }
}

/// Remote document key for a pairing: "EEE 3100" -> "eee_3100".
pub fn pairing_key(course_code: &str) -> String {
    course_code
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub display_name: String,
    pub email: String,
    pub student_name: String,
    pub student_roll: String,
    pub section: String,
    pub department_name: String,
    pub designation: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(sqlx::FromRow, Clone, Default)]
pub struct DbProfile {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub student_name: Option<String>,
    pub student_roll: Option<String>,
    pub section: Option<String>,
    pub department_name: Option<String>,
    pub designation: Option<String>,
    pub created_at: Option<NaiveDateTime>,
}

impl From<DbProfile> for Profile {
    fn from(db: DbProfile) -> Self {
        Self {
            display_name: db.display_name.unwrap_or_default(),
            email: db.email.unwrap_or_default(),
            student_name: db.student_name.unwrap_or_default(),
            student_roll: db.student_roll.unwrap_or_default(),
            section: db.section.unwrap_or_default(),
            department_name: db.department_name.unwrap_or_default(),
            designation: db.designation.unwrap_or_default(),
            created_at: db
                .created_at
                .map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub id: i64,
    pub email: String,
    pub display_name: String,
    pub student_name: String,
    pub student_roll: String,
    pub role: String,
    pub covers_generated: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone, Default)]
pub struct DbAccountSummary {
    pub id: Option<i64>,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub student_name: Option<String>,
    pub student_roll: Option<String>,
    pub role: Option<String>,
    pub covers_generated: Option<i64>,
    pub created_at: Option<NaiveDateTime>,
}

impl From<DbAccountSummary> for AccountSummary {
    fn from(db: DbAccountSummary) -> Self {
        Self {
            id: db.id.unwrap_or_default(),
            email: db.email.unwrap_or_default(),
            display_name: db.display_name.unwrap_or_default(),
            student_name: db.student_name.unwrap_or_default(),
            student_roll: db.student_roll.unwrap_or_default(),
            role: db.role.unwrap_or_default(),
            covers_generated: db.covers_generated.unwrap_or_default(),
            created_at: to_utc(db.created_at),
        }
    }
}

fn to_utc(dt: Option<NaiveDateTime>) -> DateTime<Utc> {
    dt.map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc))
        .unwrap_or_else(Utc::now)
}
