#[cfg(test)]
mod tests {
    use rocket::http::{ContentType, Status};
    use serde_json::json;

    use crate::cover::CoverSheet;
    use crate::cover::sheet::{UNIVERSITY, escape_html, export_filename, render_html, roll_label};
    use crate::models::FormData;
    use crate::test::test_utils::{create_standard_test_db, setup_test_client};

    fn lab_form() -> FormData {
        FormData {
            department_name: "Electrical & Electronic Engineering (EEE)".to_string(),
            report_type: "LAB Report".to_string(),
            course_code: "EEE 3100".to_string(),
            course_title: "Electronics Shop Practice".to_string(),
            experiment_no: "1".to_string(),
            experiment_name: "Introduction to PCB design".to_string(),
            student_name: "Rahim".to_string(),
            student_roll: "2201059".to_string(),
            section: "A".to_string(),
            teacher_name: "Dr. Kazi Khairul Islam".to_string(),
            designation: "Professor".to_string(),
            teacher_department: "EEE".to_string(),
            date_of_experiment: "2025-05-20".to_string(),
            date_of_submission: "2025-05-27".to_string(),
        }
    }

    #[test]
    fn test_lab_report_sheet() {
        let sheet = CoverSheet::from_form(&lab_form());

        assert_eq!(
            sheet.department_line,
            "Department of Electrical & Electronic Engineering (EEE)"
        );
        assert_eq!(sheet.university, UNIVERSITY);
        assert_eq!(sheet.heading, "LAB Report");
        assert_eq!(sheet.experiment_rows.len(), 2);
        assert_eq!(sheet.experiment_rows[0].label, "Experiment No");
        assert_eq!(sheet.experiment_rows[0].value, "01");
        assert_eq!(sheet.experiment_rows[1].label, "Experiment Name");
        assert_eq!(sheet.teacher_department_line, "Dept. of EEE, RUET");
    }

    #[test]
    fn test_blank_sheet_fallbacks() {
        let sheet = CoverSheet::from_form(&FormData::default());

        assert_eq!(sheet.department_line, "Department of ____________________");
        assert_eq!(sheet.heading, "LAB REPORT");
        assert_eq!(sheet.experiment_rows[0].value, "");
        assert_eq!(sheet.teacher_department_line, "Dept. of EEE, RUET");
    }

    #[test]
    fn test_assignment_labels_and_hidden_name_row() {
        let form = FormData {
            report_type: "Assignment".to_string(),
            experiment_no: "x".to_string(),
            experiment_name: String::new(),
            ..lab_form()
        };
        let sheet = CoverSheet::from_form(&form);

        assert_eq!(sheet.experiment_rows.len(), 1);
        assert_eq!(sheet.experiment_rows[0].label, "Assignment No");
        assert_eq!(sheet.experiment_rows[0].value, "00");

        let named = CoverSheet::from_form(&FormData {
            experiment_name: "Fourier series".to_string(),
            ..form
        });
        assert_eq!(named.experiment_rows[1].label, "Assignment Name");
    }

    #[test]
    fn test_rendered_html_is_escaped_and_complete() {
        let form = FormData {
            student_name: "<script>alert(1)</script>".to_string(),
            ..lab_form()
        };
        let html = render_html(&CoverSheet::from_form(&form));

        assert!(html.contains("id=\"cover-page\""));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("Electrical &amp; Electronic Engineering (EEE)"));
        assert!(!html.contains("{{"), "every placeholder is filled");
    }

    #[test]
    fn test_escape_html_blocks_placeholder_injection() {
        assert_eq!(escape_html("{{title}}"), "&#123;&#123;title}}");
        assert_eq!(escape_html("a & \"b\""), "a &amp; &quot;b&quot;");
    }

    #[test]
    fn test_export_filenames() {
        let form = lab_form();
        assert_eq!(export_filename(&form, roll_label(&form)), "EEE 3100_2201059_1.pdf");
        assert_eq!(export_filename(&form, "Group 3"), "EEE 3100_Group 3_1.pdf");

        let blank = FormData::default();
        assert_eq!(export_filename(&blank, roll_label(&blank)), "CODE_ROLL_00.pdf");
    }

    #[rocket::async_test]
    async fn test_preview_endpoint_renders_html() {
        let (client, _, _) = setup_test_client(create_standard_test_db().await).await;

        let response = client
            .post("/api/cover/preview")
            .header(ContentType::JSON)
            .body(json!({ "form": lab_form() }).to_string())
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok);
        assert_eq!(response.content_type(), Some(ContentType::HTML));
        let html = response.into_string().await.expect("html body");
        assert!(html.contains("Electronics Shop Practice"));
        assert!(html.contains("2201059"));
    }
}
