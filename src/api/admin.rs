use std::cmp::Ordering;

use rocket::State;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use sqlx::{Pool, Sqlite};

use crate::auth::{Permission, User};
use crate::db::list_accounts;
use crate::models::AccountSummary;
use crate::validation::{AppErrorExt, ValidationResponse};

fn text_column(account: &AccountSummary, key: &str) -> String {
    let value = match key {
        "email" => &account.email,
        "displayName" => &account.display_name,
        "studentName" => &account.student_name,
        "studentRoll" => &account.student_roll,
        "role" => &account.role,
        _ => "",
    };
    value.to_lowercase()
}

fn sort_name(account: &AccountSummary) -> String {
    if account.student_name.is_empty() {
        account.display_name.to_lowercase()
    } else {
        account.student_name.to_lowercase()
    }
}

fn compare(a: &AccountSummary, b: &AccountSummary, key: &str) -> Ordering {
    match key {
        "coversGenerated" => a.covers_generated.cmp(&b.covers_generated),
        "createdAt" => a.created_at.cmp(&b.created_at),
        "name" => sort_name(a).cmp(&sort_name(b)),
        other => text_column(a, other).cmp(&text_column(b, other)),
    }
}

/// The admin listing: case-insensitive search over name, email and roll,
/// then a stable sort on one column. Newest accounts first by default.
pub fn select_accounts(
    accounts: Vec<AccountSummary>,
    search: Option<&str>,
    sort: Option<&str>,
    ascending: bool,
) -> Vec<AccountSummary> {
    let needle = search.unwrap_or_default().trim().to_lowercase();
    let key = sort.filter(|s| !s.is_empty()).unwrap_or("createdAt");

    let mut selected: Vec<AccountSummary> = accounts
        .into_iter()
        .filter(|a| {
            needle.is_empty()
                || [&a.display_name, &a.email, &a.student_name, &a.student_roll]
                    .iter()
                    .any(|value| value.to_lowercase().contains(&needle))
        })
        .collect();

    selected.sort_by(|a, b| {
        let ordering = compare(a, b, key);
        if ascending { ordering } else { ordering.reverse() }
    });

    selected
}

#[get("/admin/users?<search>&<sort>&<asc>")]
pub async fn api_list_accounts(
    search: Option<String>,
    sort: Option<String>,
    asc: Option<bool>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<AccountSummary>>, Custom<Json<ValidationResponse>>> {
    user.require_permission(Permission::ViewAllAccounts)
        .validate_custom()?;

    let accounts = list_accounts(db).await.validate_custom()?;

    Ok(Json(select_accounts(
        accounts,
        search.as_deref(),
        sort.as_deref(),
        asc.unwrap_or(false),
    )))
}
