use serde::Serialize;

use crate::models::{FormData, ReportType};

pub const UNIVERSITY: &str = "Rajshahi University of Engineering & Technology";

const COVER_TEMPLATE: &str = include_str!("../../templates/cover.html");
const DEPARTMENT_PLACEHOLDER: &str = "____________________";
const DEFAULT_HEADING: &str = "LAB REPORT";
const DEFAULT_TEACHER_DEPARTMENT: &str = "EEE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Row {
    pub label: String,
    pub value: String,
}

impl Row {
    fn new(label: &str, value: &str) -> Self {
        Self {
            label: label.to_string(),
            value: value.to_string(),
        }
    }
}

/// What one printed cover shows, already resolved from a form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverSheet {
    pub department_line: String,
    pub university: String,
    pub heading: String,
    pub course_code: String,
    pub course_title: String,
    pub experiment_rows: Vec<Row>,
    pub student_name: String,
    pub student_roll: String,
    pub section: String,
    pub teacher_name: String,
    pub designation: String,
    pub teacher_department_line: String,
    pub date_of_experiment: String,
    pub date_of_submission: String,
}

impl CoverSheet {
    pub fn from_form(form: &FormData) -> Self {
        let kind = form.report_kind();

        let department_line = format!(
            "Department of {}",
            non_empty_or(&form.department_name, DEPARTMENT_PLACEHOLDER)
        );

        let mut experiment_rows = vec![Row::new(
            kind.number_label(),
            &display_number(&form.experiment_no),
        )];
        // An assignment without a name has no name row at all.
        if !(kind == ReportType::Assignment && form.experiment_name.is_empty()) {
            experiment_rows.push(Row::new(kind.name_label(), &form.experiment_name));
        }

        Self {
            department_line,
            university: UNIVERSITY.to_string(),
            heading: non_empty_or(&form.report_type, DEFAULT_HEADING).to_string(),
            course_code: form.course_code.clone(),
            course_title: form.course_title.clone(),
            experiment_rows,
            student_name: form.student_name.clone(),
            student_roll: form.student_roll.clone(),
            section: form.section.clone(),
            teacher_name: form.teacher_name.clone(),
            designation: form.designation.clone(),
            teacher_department_line: format!(
                "Dept. of {}, RUET",
                non_empty_or(&form.teacher_department, DEFAULT_TEACHER_DEPARTMENT)
            ),
            date_of_experiment: form.date_of_experiment.clone(),
            date_of_submission: form.date_of_submission.clone(),
        }
    }
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() { fallback } else { value }
}

/// Printed experiment number: two digits, "00" for anything non-numeric.
fn display_number(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    let digits: String = value
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    format!("{:02}", digits.parse::<u64>().unwrap_or(0))
}

pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            '{' => escaped.push_str("&#123;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Escaped cell text; blank cells keep their height with a non-breaking space.
fn cell(value: &str) -> String {
    if value.is_empty() {
        "&nbsp;".to_string()
    } else {
        escape_html(value)
    }
}

pub fn render_html(sheet: &CoverSheet) -> String {
    let experiment_rows = sheet
        .experiment_rows
        .iter()
        .map(|row| {
            format!(
                "<tr><td class=\"label\">{}</td><td class=\"colon\">:</td><td class=\"value\">{}</td></tr>",
                escape_html(&row.label),
                cell(&row.value)
            )
        })
        .collect::<Vec<_>>()
        .join("\n      ");

    let title = if sheet.course_code.is_empty() {
        sheet.heading.clone()
    } else {
        format!("{} {}", sheet.course_code, sheet.heading)
    };

    let mut output = COVER_TEMPLATE.to_string();
    output = output.replace("{{title}}", &escape_html(&title));
    output = output.replace("{{department_line}}", &escape_html(&sheet.department_line));
    output = output.replace("{{university}}", &escape_html(&sheet.university));
    output = output.replace("{{heading}}", &escape_html(&sheet.heading));
    output = output.replace("{{course_code}}", &cell(&sheet.course_code));
    output = output.replace("{{course_title}}", &cell(&sheet.course_title));
    output = output.replace("{{experiment_rows}}", &experiment_rows);
    output = output.replace("{{student_name}}", &cell(&sheet.student_name));
    output = output.replace("{{student_roll}}", &cell(&sheet.student_roll));
    output = output.replace("{{section}}", &cell(&sheet.section));
    output = output.replace("{{teacher_name}}", &cell(&sheet.teacher_name));
    output = output.replace("{{designation}}", &cell(&sheet.designation));
    output = output.replace(
        "{{teacher_department_line}}",
        &escape_html(&sheet.teacher_department_line),
    );
    output = output.replace("{{date_of_experiment}}", &cell(&sheet.date_of_experiment));
    output = output.replace("{{date_of_submission}}", &cell(&sheet.date_of_submission));
    output
}

/// `{courseCode}_{label}_{experimentNo}.pdf`, where the label is a roll or a group name.
pub fn export_filename(form: &FormData, label: &str) -> String {
    format!(
        "{}_{}_{}.pdf",
        non_empty_or(&form.course_code, "CODE"),
        label,
        non_empty_or(&form.experiment_no, "00")
    )
}

pub fn roll_label(form: &FormData) -> &str {
    non_empty_or(&form.student_roll, "ROLL")
}
