#[cfg(test)]
pub mod test_db {
    use crate::auth::Role;
    use crate::db::{create_group, create_user, update_group};
    use crate::error::AppError;
    use crate::models::Member;
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::{Pool, Sqlite};
    use std::collections::HashMap;
    use std::sync::Once;
    use tracing_subscriber::EnvFilter;

    static INIT: Once = Once::new();
    pub static STANDARD_PASSWORD: &str = "password123";

    #[derive(Default)]
    pub struct TestDbBuilder {
        users: Vec<TestUser>,
        groups: Vec<TestGroup>,
    }

    pub struct TestUser {
        pub email: String,
        pub display_name: String,
        pub role: Role,
        pub password: String,
    }

    pub struct TestGroup {
        pub owner_email: String,
        pub name: String,
        pub members: Vec<Member>,
    }

    impl TestDbBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn member(mut self, email: &str, display_name: &str) -> Self {
            self.users.push(TestUser {
                email: email.to_string(),
                display_name: display_name.to_string(),
                role: Role::Member,
                password: STANDARD_PASSWORD.to_string(),
            });
            self
        }

        pub fn admin(mut self, email: &str, display_name: &str) -> Self {
            self.users.push(TestUser {
                email: email.to_string(),
                display_name: display_name.to_string(),
                role: Role::Admin,
                password: STANDARD_PASSWORD.to_string(),
            });
            self
        }

        /// A group owned by `owner_email`; members are `(name, roll)` pairs.
        pub fn group(mut self, owner_email: &str, name: &str, members: &[(&str, &str)]) -> Self {
            self.groups.push(TestGroup {
                owner_email: owner_email.to_string(),
                name: name.to_string(),
                members: members
                    .iter()
                    .map(|(name, roll)| Member {
                        name: name.to_string(),
                        roll: roll.to_string(),
                        section: String::new(),
                    })
                    .collect(),
            });
            self
        }

        pub async fn build(self) -> Result<TestDb, AppError> {
            INIT.call_once(|| {
                let _ = tracing_subscriber::fmt()
                    .with_env_filter(EnvFilter::new("debug"))
                    .with_test_writer()
                    .try_init();
            });

            // One connection that never recycles: each in-memory connection
            // is its own database.
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect("sqlite::memory:")
                .await?;

            sqlx::migrate!("./migrations").run(&pool).await?;

            let mut user_id_map: HashMap<String, i64> = HashMap::new();
            let mut group_id_map: HashMap<String, i64> = HashMap::new();

            for user in &self.users {
                let user_id = create_user(
                    &pool,
                    &user.email,
                    &user.password,
                    &user.display_name,
                    user.role.clone(),
                )
                .await?;
                user_id_map.insert(user.email.clone(), user_id);
            }

            for group in &self.groups {
                let Some(owner_id) = user_id_map.get(&group.owner_email).copied() else {
                    return Err(AppError::NotFound(format!(
                        "Group owner {} was not added to the builder",
                        group.owner_email
                    )));
                };

                let created = create_group(&pool, owner_id, &group.name).await?;
                update_group(&pool, owner_id, created.id, None, Some(&group.members)).await?;
                group_id_map.insert(group.name.clone(), created.id);
            }

            Ok(TestDb {
                pool,
                user_id_map,
                group_id_map,
            })
        }
    }

    pub struct TestDb {
        pub pool: Pool<Sqlite>,
        pub user_id_map: HashMap<String, i64>,
        pub group_id_map: HashMap<String, i64>,
    }

    impl TestDb {
        pub fn user_id(&self, email: &str) -> Option<i64> {
            self.user_id_map.get(email).copied()
        }

        pub fn group_id(&self, name: &str) -> Option<i64> {
            self.group_id_map.get(name).copied()
        }
    }
}

#[cfg(test)]
pub mod test_utils {
    use std::sync::Arc;
    use std::time::Duration;

    use rocket::http::{ContentType, Status};
    use rocket::local::asynchronous::Client;
    use serde_json::json;
    use tokio::sync::Mutex;

    use super::test_db::{STANDARD_PASSWORD, TestDb, TestDbBuilder};
    use crate::config::AppConfig;
    use crate::cover::{CoverRasterizer, ExportError, Exporter, PageImage};
    use crate::init_rocket;

    /// Stands in for the headless browser. Records every HTML document it is
    /// asked to capture, in order, and returns a tiny page for each.
    #[derive(Default)]
    pub struct RecordingRasterizer {
        pub rendered: Mutex<Vec<String>>,
        pub missing_target: bool,
    }

    impl RecordingRasterizer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn without_target() -> Self {
            Self {
                rendered: Mutex::new(Vec::new()),
                missing_target: true,
            }
        }

        pub async fn rendered(&self) -> Vec<String> {
            self.rendered.lock().await.clone()
        }
    }

    #[rocket::async_trait]
    impl CoverRasterizer for RecordingRasterizer {
        async fn rasterize(&self, html: &str) -> Result<Option<PageImage>, ExportError> {
            self.rendered.lock().await.push(html.to_string());
            if self.missing_target {
                return Ok(None);
            }
            Ok(Some(test_page()))
        }
    }

    /// A 1x1 grey JPEG, enough for the PDF writer.
    pub fn test_page() -> PageImage {
        let mut jpeg = Vec::new();
        let pixel = image::RgbImage::from_pixel(1, 1, image::Rgb([200, 200, 200]));
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg, 90)
            .encode_image(&pixel)
            .expect("encode test page");

        PageImage {
            jpeg,
            width: 1,
            height: 1,
        }
    }

    pub fn test_config() -> AppConfig {
        AppConfig {
            settle_delay_ms: 0,
            admin_emails: vec!["owner@ruet.test".to_string()],
            ..AppConfig::default()
        }
    }

    pub async fn create_standard_test_db() -> TestDb {
        TestDbBuilder::new()
            .member("student@ruet.test", "Student One")
            .member("other@ruet.test", "Someone Else")
            .admin("admin@ruet.test", "Admin")
            .group(
                "student@ruet.test",
                "Group 3",
                &[
                    ("Alice", "2201001"),
                    ("Bob", "2201065"),
                    ("Carol", "2201130"),
                ],
            )
            .build()
            .await
            .expect("Failed to build standard test database")
    }

    pub async fn setup_test_client(test_db: TestDb) -> (Client, TestDb, Arc<RecordingRasterizer>) {
        setup_test_client_with(test_db, Arc::new(RecordingRasterizer::new())).await
    }

    pub async fn setup_test_client_with(
        test_db: TestDb,
        rasterizer: Arc<RecordingRasterizer>,
    ) -> (Client, TestDb, Arc<RecordingRasterizer>) {
        let exporter = Exporter::new(rasterizer.clone(), Duration::ZERO);
        let rocket = init_rocket(test_db.pool.clone(), test_config(), exporter).await;
        let client = Client::tracked(rocket)
            .await
            .expect("valid rocket instance");

        (client, test_db, rasterizer)
    }

    pub async fn login_test_user(client: &Client, email: &str) {
        let response = client
            .post("/api/login")
            .header(ContentType::JSON)
            .body(
                json!({
                    "email": email,
                    "password": STANDARD_PASSWORD
                })
                .to_string(),
            )
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok);
        let body: serde_json::Value =
            serde_json::from_str(&response.into_string().await.expect("login body"))
                .expect("login json");
        assert_eq!(body["success"], true, "login failed for {}", email);
    }
}
