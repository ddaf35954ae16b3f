use std::collections::HashMap;

use crate::models::{Field, FormData, Profile};

/// Builds the form a session opens with.
///
/// Layers, lowest first: the browser's saved snapshot, then the account
/// profile (student fields and designation only fill blanks, the department
/// always follows the profile), then explicit field overrides such as a
/// re-opened history entry. Override keys that are not form fields are ignored.
pub fn initial_form(
    snapshot: Option<FormData>,
    profile: Option<&Profile>,
    overrides: &HashMap<String, String>,
) -> FormData {
    let mut form = snapshot.unwrap_or_default();

    if let Some(profile) = profile {
        let fill_blank = [
            (Field::StudentName, &profile.student_name),
            (Field::StudentRoll, &profile.student_roll),
            (Field::Section, &profile.section),
            (Field::Designation, &profile.designation),
        ];
        for (field, value) in fill_blank {
            if !value.is_empty() && field.get(&form).is_empty() {
                field.set(&mut form, value.clone());
            }
        }

        if !profile.department_name.is_empty() {
            form.department_name = profile.department_name.clone();
        }
    }

    for (key, value) in overrides {
        if let Some(field) = Field::from_name(key) {
            field.set(&mut form, value.clone());
        }
    }

    form
}
