use std::collections::HashMap;

use chrono::{NaiveDateTime, Utc};
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::auth::{DbUser, DbUserSession, Role, User, UserSession};
use crate::error::AppError;
use crate::models::{
    AccountSummary, DbAccountSummary, DbGroup, DbHistoryEntry, DbMember, DbProfile,
    DbTeacherCoursePairing, FormData, Group, GroupTag, HistoryEntry, Member, Profile,
    TeacherCoursePairing, pairing_key,
};

const USER_COLUMNS: &str = "id, email, display_name, role";

#[instrument]
pub async fn get_user(pool: &Pool<Sqlite>, id: i64) -> Result<User, AppError> {
    info!("Fetching user by ID");
    let query = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
    let row = sqlx::query_as::<_, DbUser>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(user) => Ok(User::from(user)),
        _ => Err(AppError::NotFound(format!(
            "User with id {} not found in database",
            id
        ))),
    }
}

#[instrument]
pub async fn find_user_by_email(pool: &Pool<Sqlite>, email: &str) -> Result<Option<User>, AppError> {
    info!("Finding user by email");
    let query = format!(
        "SELECT {} FROM users WHERE email = ? COLLATE NOCASE",
        USER_COLUMNS
    );
    let row = sqlx::query_as::<_, DbUser>(&query)
        .bind(email.trim())
        .fetch_optional(pool)
        .await?;

    Ok(row.map(User::from))
}

#[instrument(skip(pool, password))]
pub async fn create_user(
    pool: &Pool<Sqlite>,
    email: &str,
    password: &str,
    display_name: &str,
    role: Role,
) -> Result<i64, AppError> {
    info!("Creating user");

    if find_user_by_email(pool, email).await?.is_some() {
        return Err(AppError::Conflict("Email is already in use".to_string()));
    }

    let hashed_password = bcrypt::hash(password, bcrypt::DEFAULT_COST)?;

    let res = sqlx::query(
        "INSERT INTO users (email, password, display_name, role) VALUES (?, ?, ?, ?)",
    )
    .bind(email.trim())
    .bind(hashed_password)
    .bind(display_name)
    .bind(role.as_str())
    .execute(pool)
    .await?;

    Ok(res.last_insert_rowid())
}

#[instrument(skip(pool, password))]
pub async fn authenticate_user(
    pool: &Pool<Sqlite>,
    email: &str,
    password: &str,
) -> Result<Option<User>, AppError> {
    info!("Authenticating user");

    #[derive(sqlx::FromRow)]
    struct Credentials {
        id: i64,
        password: String,
    }

    let row = sqlx::query_as::<_, Credentials>(
        "SELECT id, password FROM users WHERE email = ? COLLATE NOCASE",
    )
    .bind(email.trim())
    .fetch_optional(pool)
    .await?;

    let Some(credentials) = row else {
        return Ok(None);
    };

    if !bcrypt::verify(password, &credentials.password)? {
        return Ok(None);
    }

    get_user(pool, credentials.id).await.map(Some)
}

#[instrument]
pub async fn get_profile(pool: &Pool<Sqlite>, user_id: i64) -> Result<Profile, AppError> {
    info!("Fetching profile");
    let row = sqlx::query_as::<_, DbProfile>(
        "SELECT display_name, email, student_name, student_roll, section, department_name,
                designation, created_at
         FROM users WHERE id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    row.map(Profile::from)
        .ok_or_else(|| AppError::NotFound(format!("Profile for user {} not found", user_id)))
}

#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub student_name: String,
    pub student_roll: String,
    pub section: String,
    pub department_name: String,
}

/// Merges the student fields into the profile. The display name follows the
/// student name whenever one is given.
#[instrument]
pub async fn update_profile(
    pool: &Pool<Sqlite>,
    user_id: i64,
    update: &ProfileUpdate,
) -> Result<Profile, AppError> {
    info!("Updating profile");

    sqlx::query(
        "UPDATE users
         SET student_name = ?, student_roll = ?, section = ?, department_name = ?,
             display_name = CASE WHEN ? <> '' THEN ? ELSE display_name END
         WHERE id = ?",
    )
    .bind(&update.student_name)
    .bind(&update.student_roll)
    .bind(&update.section)
    .bind(&update.department_name)
    .bind(&update.student_name)
    .bind(&update.student_name)
    .bind(user_id)
    .execute(pool)
    .await?;

    get_profile(pool, user_id).await
}

#[instrument(skip(pool, token))]
pub async fn create_user_session(
    pool: &Pool<Sqlite>,
    user_id: i64,
    token: &str,
    expires_at: NaiveDateTime,
) -> Result<i64, AppError> {
    info!("Creating user session");

    let res = sqlx::query("INSERT INTO user_sessions (user_id, token, expires_at) VALUES (?, ?, ?)")
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .execute(pool)
        .await?;

    Ok(res.last_insert_rowid())
}

#[instrument(skip(pool, token))]
pub async fn get_session_by_token(pool: &Pool<Sqlite>, token: &str) -> Result<UserSession, AppError> {
    info!("Getting session by token");

    let session = sqlx::query_as::<_, DbUserSession>(
        "SELECT id, user_id, token, created_at, expires_at FROM user_sessions WHERE token = ?",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    match session {
        Some(session) => Ok(UserSession::from(session)),
        _ => Err(AppError::Authentication(
            "Invalid session token".to_string(),
        )),
    }
}

#[instrument(skip(pool, token))]
pub async fn invalidate_session(pool: &Pool<Sqlite>, token: &str) -> Result<(), AppError> {
    info!("Invalidating session");

    sqlx::query("DELETE FROM user_sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;

    Ok(())
}

#[instrument(skip(pool))]
pub async fn clean_expired_sessions(pool: &Pool<Sqlite>) -> Result<u64, AppError> {
    info!("Cleaning expired sessions");

    let now = Utc::now().naive_utc();

    let result = sqlx::query("DELETE FROM user_sessions WHERE expires_at < ?")
        .bind(now)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

async fn members_for_groups(
    pool: &Pool<Sqlite>,
    group_ids: &[i64],
) -> Result<HashMap<i64, Vec<Member>>, AppError> {
    let mut by_group: HashMap<i64, Vec<Member>> = HashMap::new();
    if group_ids.is_empty() {
        return Ok(by_group);
    }

    let placeholders = vec!["?"; group_ids.len()].join(", ");
    let query = format!(
        "SELECT group_id, name, roll, section FROM student_group_members
         WHERE group_id IN ({})
         ORDER BY group_id, position",
        placeholders
    );

    let mut q = sqlx::query_as::<_, DbMember>(&query);
    for id in group_ids {
        q = q.bind(*id);
    }

    for row in q.fetch_all(pool).await? {
        let group_id = row.group_id.unwrap_or_default();
        by_group.entry(group_id).or_default().push(Member::from(row));
    }

    Ok(by_group)
}

#[instrument]
pub async fn get_groups(pool: &Pool<Sqlite>, user_id: i64) -> Result<Vec<Group>, AppError> {
    info!("Getting groups");

    let rows = sqlx::query_as::<_, DbGroup>(
        "SELECT id, name, created_at FROM student_groups
         WHERE user_id = ?
         ORDER BY created_at DESC, id DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let ids: Vec<i64> = rows.iter().filter_map(|g| g.id).collect();
    let mut members = members_for_groups(pool, &ids).await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let group_members = row
                .id
                .and_then(|id| members.remove(&id))
                .unwrap_or_default();
            Group::from_db(row, group_members)
        })
        .collect())
}

/// Only the owner can see a group; anyone else gets `NotFound`.
#[instrument]
pub async fn get_group(pool: &Pool<Sqlite>, user_id: i64, group_id: i64) -> Result<Group, AppError> {
    info!("Getting group");

    let row = sqlx::query_as::<_, DbGroup>(
        "SELECT id, name, created_at FROM student_groups WHERE id = ? AND user_id = ?",
    )
    .bind(group_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Err(AppError::NotFound(format!("Group {} not found", group_id)));
    };

    let mut members = members_for_groups(pool, &[group_id]).await?;
    Ok(Group::from_db(row, members.remove(&group_id).unwrap_or_default()))
}

#[instrument]
pub async fn create_group(pool: &Pool<Sqlite>, user_id: i64, name: &str) -> Result<Group, AppError> {
    info!("Creating group");

    let res = sqlx::query("INSERT INTO student_groups (user_id, name) VALUES (?, ?)")
        .bind(user_id)
        .bind(name)
        .execute(pool)
        .await?;

    get_group(pool, user_id, res.last_insert_rowid()).await
}

/// Renames a group and/or replaces its member list in one transaction.
/// Members keep the order they are given in.
#[instrument(skip(members))]
pub async fn update_group(
    pool: &Pool<Sqlite>,
    user_id: i64,
    group_id: i64,
    name: Option<&str>,
    members: Option<&[Member]>,
) -> Result<Group, AppError> {
    info!("Updating group");

    // Ownership check before anything is written.
    get_group(pool, user_id, group_id).await?;

    let mut tx = pool.begin().await?;

    if let Some(name) = name {
        sqlx::query("UPDATE student_groups SET name = ? WHERE id = ? AND user_id = ?")
            .bind(name)
            .bind(group_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }

    if let Some(members) = members {
        sqlx::query("DELETE FROM student_group_members WHERE group_id = ?")
            .bind(group_id)
            .execute(&mut *tx)
            .await?;

        for (position, member) in members.iter().enumerate() {
            sqlx::query(
                "INSERT INTO student_group_members (group_id, position, name, roll, section)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(group_id)
            .bind(position as i64)
            .bind(&member.name)
            .bind(&member.roll)
            .bind(&member.section)
            .execute(&mut *tx)
            .await?;
        }
    }

    tx.commit().await?;

    get_group(pool, user_id, group_id).await
}

#[instrument]
pub async fn delete_group(pool: &Pool<Sqlite>, user_id: i64, group_id: i64) -> Result<(), AppError> {
    info!("Deleting group");

    let mut tx = pool.begin().await?;

    let res = sqlx::query("DELETE FROM student_groups WHERE id = ? AND user_id = ?")
        .bind(group_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Group {} not found", group_id)));
    }

    sqlx::query("DELETE FROM student_group_members WHERE group_id = ?")
        .bind(group_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

#[instrument(skip(form))]
pub async fn add_history(
    pool: &Pool<Sqlite>,
    user_id: i64,
    form: &FormData,
    group: Option<&GroupTag>,
) -> Result<i64, AppError> {
    info!("Recording history entry");

    let form_json = serde_json::to_string(form)?;

    let res = sqlx::query(
        "INSERT INTO history (user_id, form_json, is_group, group_id, group_name, member_count)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(form_json)
    .bind(group.is_some())
    .bind(group.map(|g| g.group_id))
    .bind(group.map(|g| g.group_name.clone()))
    .bind(group.map(|g| g.member_count))
    .execute(pool)
    .await?;

    Ok(res.last_insert_rowid())
}

#[instrument]
pub async fn get_history(pool: &Pool<Sqlite>, user_id: i64) -> Result<Vec<HistoryEntry>, AppError> {
    info!("Getting history");

    let rows = sqlx::query_as::<_, DbHistoryEntry>(
        "SELECT id, form_json, is_group, group_id, group_name, member_count, created_at
         FROM history
         WHERE user_id = ?
         ORDER BY created_at DESC, id DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(HistoryEntry::from).collect())
}

#[instrument]
pub async fn get_history_entry(
    pool: &Pool<Sqlite>,
    user_id: i64,
    entry_id: i64,
) -> Result<HistoryEntry, AppError> {
    info!("Getting history entry");

    let row = sqlx::query_as::<_, DbHistoryEntry>(
        "SELECT id, form_json, is_group, group_id, group_name, member_count, created_at
         FROM history
         WHERE id = ? AND user_id = ?",
    )
    .bind(entry_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    row.map(HistoryEntry::from)
        .ok_or_else(|| AppError::NotFound(format!("History entry {} not found", entry_id)))
}

#[instrument]
pub async fn delete_history(pool: &Pool<Sqlite>, user_id: i64, entry_id: i64) -> Result<(), AppError> {
    info!("Deleting history entry");

    let res = sqlx::query("DELETE FROM history WHERE id = ? AND user_id = ?")
        .bind(entry_id)
        .bind(user_id)
        .execute(pool)
        .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "History entry {} not found",
            entry_id
        )));
    }
    Ok(())
}

#[instrument]
pub async fn get_teacher_courses(
    pool: &Pool<Sqlite>,
    user_id: i64,
) -> Result<Vec<TeacherCoursePairing>, AppError> {
    info!("Getting teacher-course pairings");

    let rows = sqlx::query_as::<_, DbTeacherCoursePairing>(
        "SELECT course_code, teacher_name FROM teacher_courses
         WHERE user_id = ?
         ORDER BY updated_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(TeacherCoursePairing::from).collect())
}

#[instrument]
pub async fn upsert_teacher_course(
    pool: &Pool<Sqlite>,
    user_id: i64,
    course_code: &str,
    teacher_name: &str,
) -> Result<(), AppError> {
    info!("Upserting teacher-course pairing");

    sqlx::query(
        "INSERT INTO teacher_courses (user_id, course_key, course_code, teacher_name, updated_at)
         VALUES (?, ?, ?, ?, CURRENT_TIMESTAMP)
         ON CONFLICT (user_id, course_key)
         DO UPDATE SET course_code = excluded.course_code,
                       teacher_name = excluded.teacher_name,
                       updated_at = excluded.updated_at",
    )
    .bind(user_id)
    .bind(pairing_key(course_code))
    .bind(course_code)
    .bind(teacher_name)
    .execute(pool)
    .await?;

    Ok(())
}

#[instrument(skip(pool))]
pub async fn get_device_value(
    pool: &Pool<Sqlite>,
    device_id: &str,
    key: &str,
) -> Result<Option<String>, AppError> {
    let value = sqlx::query_scalar::<_, String>(
        "SELECT value FROM device_cache WHERE device_id = ? AND key = ?",
    )
    .bind(device_id)
    .bind(key)
    .fetch_optional(pool)
    .await?;

    Ok(value)
}

#[instrument(skip(pool, value))]
pub async fn set_device_value(
    pool: &Pool<Sqlite>,
    device_id: &str,
    key: &str,
    value: &str,
) -> Result<(), AppError> {
    info!("Writing device cache");

    sqlx::query(
        "INSERT INTO device_cache (device_id, key, value, updated_at)
         VALUES (?, ?, ?, CURRENT_TIMESTAMP)
         ON CONFLICT (device_id, key)
         DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
    )
    .bind(device_id)
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}

/// Drops every cached value of browsers whose newest write is older than
/// `cutoff`. Returns the number of rows removed.
#[instrument(skip(pool))]
pub async fn clean_stale_device_cache(
    pool: &Pool<Sqlite>,
    cutoff: NaiveDateTime,
) -> Result<u64, AppError> {
    info!("Cleaning stale device cache");

    let result = sqlx::query(
        "DELETE FROM device_cache WHERE device_id IN (
             SELECT device_id FROM device_cache
             GROUP BY device_id
             HAVING MAX(updated_at) < ?
         )",
    )
    .bind(cutoff)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

#[instrument]
pub async fn list_accounts(pool: &Pool<Sqlite>) -> Result<Vec<AccountSummary>, AppError> {
    info!("Listing accounts");

    let rows = sqlx::query_as::<_, DbAccountSummary>(
        "SELECT u.id, u.email, u.display_name, u.student_name, u.student_roll, u.role,
                COUNT(h.id) AS covers_generated, u.created_at
         FROM users u
         LEFT JOIN history h ON h.user_id = u.id
         GROUP BY u.id
         ORDER BY u.created_at DESC, u.id DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(AccountSummary::from).collect())
}
