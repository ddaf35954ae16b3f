use serde::Serialize;
use sqlx::{Pool, Sqlite};
use tracing::{debug, instrument, warn};

use super::catalog::{self, CatalogFilter};
use super::memory::LocalMemory;
use super::providers::{
    CatalogProvider, LocalMemoryProvider, LookupProvider, ProviderChain, RemotePairingProvider,
    Source,
};
use super::roll::{section_from_roll, series_from_roll};
use crate::db::upsert_teacher_course;
use crate::models::{Field, FormData, Member};

/// The catalog filter triple for a form.
///
/// The department abbreviation comes from the department name. Series and
/// section come from the student's roll (an explicit section wins over the
/// classifier). In group mode the first member whose roll and section
/// complete the triple supplies series and section instead.
pub fn scope_filter(form: &FormData, members: Option<&[Member]>) -> Option<CatalogFilter> {
    let department = catalog::department_abbreviation(&form.department_name)?;

    match members {
        // The form's own section belongs to the solo student, not the group.
        Some(members) => members
            .iter()
            .find_map(|m| triple(&department, &m.roll, &m.section)),
        None => triple(&department, &form.student_roll, &form.section),
    }
}

fn triple(department: &str, roll: &str, section: &str) -> Option<CatalogFilter> {
    let series = series_from_roll(roll);
    let section = match section.trim() {
        "" => section_from_roll(roll).map(|s| s.as_str().to_string()),
        explicit => Some(explicit.to_string()),
    };
    CatalogFilter::complete(Some(department), series.as_deref(), section.as_deref())
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reconciled {
    pub form: FormData,
    pub experiment_numbers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PersistAction {
    RememberCourse { code: String, title: String },
    RememberStudent { name: String, roll: String },
    #[serde(rename_all = "camelCase")]
    RememberPairing {
        course_code: String,
        teacher_name: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct Committed {
    pub form: FormData,
    #[serde(skip)]
    pub actions: Vec<PersistAction>,
}

/// Keeps dependent cover fields consistent while one field is edited.
///
/// Nothing here fails: a lookup that finds nothing leaves the dependent
/// field as it was.
pub struct Reconciler<'a> {
    memory: LocalMemory<'a>,
    remote: RemotePairingProvider,
    members: Option<&'a [Member]>,
}

impl<'a> Reconciler<'a> {
    pub fn new(memory: LocalMemory<'a>) -> Self {
        Self {
            memory,
            remote: RemotePairingProvider::default(),
            members: None,
        }
    }

    pub fn with_remote_pairings(mut self, remote: RemotePairingProvider) -> Self {
        self.remote = remote;
        self
    }

    pub fn in_group(mut self, members: &'a [Member]) -> Self {
        self.members = Some(members);
        self
    }

    pub fn filter(&self, form: &FormData) -> Option<CatalogFilter> {
        scope_filter(form, self.members)
    }

    #[instrument(skip(self, form), fields(field = field.as_str()))]
    pub async fn apply_edit(&self, form: &FormData, field: Field, value: &str) -> Reconciled {
        let mut updated = form.clone();
        field.set(&mut updated, value.to_string());

        let filter = self.filter(&updated);
        debug!(filter = ?filter, "Reconciling edit");

        let catalog = CatalogProvider::new(filter.clone());
        let local = LocalMemoryProvider::new(self.memory);
        let courses = ProviderChain::new(vec![&catalog as &dyn LookupProvider, &local]);
        let pairings = ProviderChain::new(vec![&self.remote as &dyn LookupProvider, &local]);

        match field {
            Field::CourseCode => {
                if let Some((_, title)) = courses.course_title_for_code(value).await {
                    updated.course_title = title;
                }
                updated.experiment_no.clear();
                updated.experiment_name.clear();

                if let Some((_, teacher_name)) = pairings.teacher_for_course(value).await {
                    fill_teacher(&mut updated, teacher_name);
                }
            }
            Field::CourseTitle => {
                if let Some((source, code)) = courses.course_code_for_title(value).await {
                    updated.course_code = code;
                    if source == Source::Catalog {
                        updated.experiment_no.clear();
                        updated.experiment_name.clear();
                    }
                }
            }
            Field::ExperimentNo => {
                if let Some(filter) = &filter {
                    if let Some(name) =
                        catalog::find_experiment_name(&updated.course_code, value, filter)
                    {
                        updated.experiment_name = name;
                    }
                }
            }
            Field::StudentName => {
                if let Some(student) = self.memory.student_by_name(value).await {
                    if !student.roll.is_empty() {
                        if let Some(section) = section_from_roll(&student.roll) {
                            updated.section = section.to_string();
                        }
                        updated.student_roll = student.roll;
                    }
                }
            }
            Field::StudentRoll => {
                if let Some(student) = self.memory.student_by_roll(value).await {
                    if !student.name.is_empty() {
                        updated.student_name = student.name;
                    }
                }
                if let Some(section) = section_from_roll(value) {
                    updated.section = section.to_string();
                }
            }
            Field::TeacherName => {
                if let Some(teacher) = catalog::find_teacher(value) {
                    updated.designation = teacher.designation.clone();
                    updated.teacher_department = teacher.department.clone();
                }
            }
            _ => {}
        }

        // The section may have moved with the roll, so the scope is re-read.
        let experiment_numbers = self
            .filter(&updated)
            .map(|f| catalog::experiment_numbers(&updated.course_code, &f))
            .unwrap_or_default();

        Reconciled {
            form: updated,
            experiment_numbers,
        }
    }

    /// The blur step: final formatting plus what should be remembered.
    pub fn commit(&self, form: &FormData, field: Field) -> Committed {
        let mut form = form.clone();
        let mut actions = Vec::new();

        if field == Field::ExperimentNo && !form.experiment_no.trim().is_empty() {
            form.experiment_no = catalog::pad_experiment_no(form.experiment_no.trim());
        }

        if matches!(
            field,
            Field::CourseCode | Field::CourseTitle | Field::ExperimentNo
        ) && (!form.course_code.is_empty() || !form.course_title.is_empty())
        {
            actions.push(PersistAction::RememberCourse {
                code: form.course_code.clone(),
                title: form.course_title.clone(),
            });
        }

        if matches!(field, Field::StudentName | Field::StudentRoll)
            && (!form.student_name.is_empty() || !form.student_roll.is_empty())
        {
            actions.push(PersistAction::RememberStudent {
                name: form.student_name.clone(),
                roll: form.student_roll.clone(),
            });
        }

        if matches!(field, Field::TeacherName | Field::CourseCode)
            && !form.course_code.is_empty()
            && !form.teacher_name.is_empty()
        {
            actions.push(PersistAction::RememberPairing {
                course_code: form.course_code.clone(),
                teacher_name: form.teacher_name.clone(),
            });
        }

        Committed { form, actions }
    }
}

fn fill_teacher(form: &mut FormData, teacher_name: String) {
    if let Some(teacher) = catalog::find_teacher(&teacher_name) {
        form.designation = teacher.designation.clone();
        form.teacher_department = teacher.department.clone();
    }
    form.teacher_name = teacher_name;
}

/// Runs persistence actions. Every write is best-effort: a failure is
/// logged and the remaining actions still run.
#[instrument(skip(memory, remote, actions), fields(count = actions.len()))]
pub async fn persist(
    actions: &[PersistAction],
    memory: &LocalMemory<'_>,
    remote: Option<(&Pool<Sqlite>, i64)>,
) {
    for action in actions {
        let local = match action {
            PersistAction::RememberCourse { code, title } => {
                memory.remember_course(code, title).await
            }
            PersistAction::RememberStudent { name, roll } => {
                memory.remember_student(name, roll).await
            }
            PersistAction::RememberPairing {
                course_code,
                teacher_name,
            } => {
                if let Some((pool, user_id)) = remote {
                    if let Err(err) =
                        upsert_teacher_course(pool, user_id, course_code, teacher_name).await
                    {
                        warn!(
                            user_id = %user_id,
                            course_code = %course_code,
                            error = %err,
                            "Remote pairing write failed, continuing"
                        );
                    }
                }
                memory.remember_pairing(course_code, teacher_name).await
            }
        };

        if let Err(err) = local {
            warn!(action = ?action, error = %err, "Local memory write failed, continuing");
        }
    }
}
