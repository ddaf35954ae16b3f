use chrono::Utc;
use rocket::State;
use rocket::http::{Cookie, CookieJar, SameSite, Status};
use rocket::response::status::Custom;
use rocket::serde::{Deserialize, Serialize, json::Json};
use sqlx::{Pool, Sqlite};
use tracing::{info, warn};
use validator::Validate;

use crate::auth::{Permission, Role, SESSION_COOKIE, USER_ID_COOKIE, User, UserSession};
use crate::autofill::roll::section_from_roll;
use crate::config::AppConfig;
use crate::db::{
    ProfileUpdate, authenticate_user, create_user, create_user_session, get_profile, get_user,
    invalidate_session, update_profile,
};
use crate::error::AppError;
use crate::models::Profile;
use crate::validation::{AppErrorExt, JsonValidateExt, ToValidationResponse, ValidationResponse};

pub const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[validate(email(message = "Enter a valid email address"))]
    email: String,
    #[validate(length(min = 6, message = "Password should be at least 6 characters"))]
    password: String,
    #[validate(length(min = 1, message = "Display name is required"))]
    display_name: String,
}

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user: Option<User>,
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct MeResponse {
    pub user: User,
    pub profile: Profile,
}

async fn start_session(
    db: &Pool<Sqlite>,
    cookies: &CookieJar<'_>,
    user: &User,
    hours: i64,
) -> Result<(), AppError> {
    let token = UserSession::generate_token();
    let expires_at = Utc::now() + chrono::Duration::hours(hours);

    create_user_session(db, user.id, &token, expires_at.naive_utc()).await?;

    cookies.add_private(
        Cookie::build((SESSION_COOKIE, token))
            .same_site(SameSite::Lax)
            .http_only(true)
            .max_age(rocket::time::Duration::hours(hours)),
    );
    cookies.add_private(
        Cookie::build((USER_ID_COOKIE, user.id.to_string()))
            .same_site(SameSite::Lax)
            .http_only(true)
            .max_age(rocket::time::Duration::hours(hours)),
    );

    Ok(())
}

#[post("/signup", data = "<signup>")]
pub async fn api_signup(
    signup: Json<SignupRequest>,
    cookies: &CookieJar<'_>,
    db: &State<Pool<Sqlite>>,
    config: &State<AppConfig>,
) -> Result<Json<LoginResponse>, Custom<Json<ValidationResponse>>> {
    let validated = signup.validate_custom()?;

    let role = if config.is_admin_email(&validated.email) {
        Role::Admin
    } else {
        Role::Member
    };

    let user_id = match create_user(
        db,
        &validated.email,
        &validated.password,
        validated.display_name.trim(),
        role,
    )
    .await
    {
        Ok(id) => id,
        Err(AppError::Conflict(message)) => {
            return Err(Custom(
                Status::Conflict,
                Json(ValidationResponse::with_error("email", &message)),
            ));
        }
        Err(err) => return Err(err.to_validation_response()),
    };

    let user = get_user(db, user_id).await.validate_custom()?;
    start_session(db, cookies, &user, config.session_hours)
        .await
        .validate_custom()?;

    info!(user_id = %user.id, role = %user.role, "Account created");

    Ok(Json(LoginResponse {
        success: true,
        user: Some(user),
        error: None,
    }))
}

#[post("/login", data = "<login>")]
pub async fn api_login(
    login: Json<LoginRequest>,
    cookies: &CookieJar<'_>,
    db: &State<Pool<Sqlite>>,
    config: &State<AppConfig>,
) -> Result<Json<LoginResponse>, Custom<Json<ValidationResponse>>> {
    let validated = login.validate_custom()?;

    match authenticate_user(db, &validated.email, &validated.password)
        .await
        .validate_custom()?
    {
        Some(user) => {
            start_session(db, cookies, &user, config.session_hours)
                .await
                .validate_custom()?;

            Ok(Json(LoginResponse {
                success: true,
                user: Some(user),
                error: None,
            }))
        }
        None => Ok(Json(LoginResponse {
            success: false,
            user: None,
            error: Some(INVALID_CREDENTIALS.to_string()),
        })),
    }
}

#[post("/logout")]
pub async fn api_logout(cookies: &CookieJar<'_>, db: &State<Pool<Sqlite>>) -> Status {
    let token = cookies
        .get_private(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string());

    if let Some(token) = token {
        if let Err(err) = invalidate_session(db, &token).await {
            warn!(error = %err, "Failed to invalidate session on logout");
        }
    }

    cookies.remove_private(Cookie::build(SESSION_COOKIE));
    cookies.remove_private(Cookie::build(USER_ID_COOKIE));

    Status::Ok
}

#[get("/me")]
pub async fn api_me(
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<MeResponse>, Custom<Json<ValidationResponse>>> {
    let profile = get_profile(db, user.id).await.validate_custom()?;
    Ok(Json(MeResponse { user, profile }))
}

#[get("/profile")]
pub async fn api_get_profile(
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Profile>, Custom<Json<ValidationResponse>>> {
    user.require_permission(Permission::ViewOwnProfile)
        .validate_custom()?;

    get_profile(db, user.id).await.validate_custom().map(Json)
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileRequest {
    student_name: String,
    student_roll: String,
    section: String,
    department_name: String,
}

impl ProfileRequest {
    /// The roll decides the section whenever it can.
    fn into_update(self) -> ProfileUpdate {
        let student_roll = self.student_roll.trim().to_string();
        let section = section_from_roll(&student_roll)
            .map(|s| s.to_string())
            .unwrap_or(self.section);

        ProfileUpdate {
            student_name: self.student_name.trim().to_string(),
            student_roll,
            section,
            department_name: self.department_name,
        }
    }
}

#[put("/profile", data = "<profile>")]
pub async fn api_update_profile(
    profile: Json<ProfileRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Profile>, Custom<Json<ValidationResponse>>> {
    user.require_permission(Permission::EditOwnProfile)
        .validate_custom()?;

    update_profile(db, user.id, &profile.into_inner().into_update())
        .await
        .validate_custom()
        .map(Json)
}
