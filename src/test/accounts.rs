#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rocket::http::{ContentType, Cookie, Status};
    use rocket::local::asynchronous::Client;
    use serde_json::{Value, json};

    use crate::api::account::INVALID_CREDENTIALS;
    use crate::auth::{SESSION_COOKIE, USER_ID_COOKIE};
    use crate::db::create_user_session;
    use crate::test::test_db::TestDbBuilder;
    use crate::test::test_utils::{create_standard_test_db, login_test_user, setup_test_client};

    async fn signup(client: &Client, email: &str, password: &str, name: &str) -> (Status, Value) {
        let response = client
            .post("/api/signup")
            .header(ContentType::JSON)
            .body(
                json!({
                    "email": email,
                    "password": password,
                    "displayName": name
                })
                .to_string(),
            )
            .dispatch()
            .await;

        let status = response.status();
        let body = response.into_json::<Value>().await.unwrap_or(Value::Null);
        (status, body)
    }

    async fn me_status(client: &Client) -> Status {
        client.get("/api/me").dispatch().await.status()
    }

    #[rocket::async_test]
    async fn test_signup_signs_in() {
        let (client, _, _) = setup_test_client(TestDbBuilder::new().build().await.unwrap()).await;

        let (status, body) = signup(&client, "new@ruet.test", "secret1", "New Student").await;
        assert_eq!(status, Status::Ok);
        assert_eq!(body["success"], true);
        assert_eq!(body["user"]["email"], "new@ruet.test");
        assert_eq!(body["user"]["role"], "Member");

        let me: Value = client
            .get("/api/me")
            .dispatch()
            .await
            .into_json()
            .await
            .expect("me json");
        assert_eq!(me["user"]["displayName"], "New Student");
        assert_eq!(me["profile"]["email"], "new@ruet.test");
    }

    #[rocket::async_test]
    async fn test_configured_admin_email_gets_admin_role() {
        let (client, _, _) = setup_test_client(TestDbBuilder::new().build().await.unwrap()).await;

        let (_, body) = signup(&client, "owner@ruet.test", "secret1", "Owner").await;
        assert_eq!(body["user"]["role"], "Admin");
    }

    #[rocket::async_test]
    async fn test_duplicate_email_is_a_conflict() {
        let (client, _, _) = setup_test_client(create_standard_test_db().await).await;

        let (status, body) = signup(&client, "student@ruet.test", "secret1", "Again").await;
        assert_eq!(status, Status::Conflict);
        assert_eq!(body["errors"]["email"][0], "Email is already in use");
    }

    #[rocket::async_test]
    async fn test_signup_validation_messages() {
        let (client, _, _) = setup_test_client(TestDbBuilder::new().build().await.unwrap()).await;

        let (status, body) = signup(&client, "short@ruet.test", "12345", "Short").await;
        assert_eq!(status, Status::UnprocessableEntity);
        assert_eq!(
            body["errors"]["password"][0],
            "Password should be at least 6 characters"
        );

        let (status, body) = signup(&client, "not-an-email", "secret1", "Bad").await;
        assert_eq!(status, Status::UnprocessableEntity);
        assert_eq!(body["errors"]["email"][0], "Enter a valid email address");

        assert_eq!(me_status(&client).await, Status::Unauthorized);
    }

    #[rocket::async_test]
    async fn test_wrong_password_reports_inline() {
        let (client, _, _) = setup_test_client(create_standard_test_db().await).await;

        let response = client
            .post("/api/login")
            .header(ContentType::JSON)
            .body(json!({ "email": "student@ruet.test", "password": "wrong" }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        let body: Value = response.into_json().await.expect("login json");
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], INVALID_CREDENTIALS);
        assert_eq!(me_status(&client).await, Status::Unauthorized);
    }

    #[rocket::async_test]
    async fn test_logout_ends_the_session() {
        let (client, _, _) = setup_test_client(create_standard_test_db().await).await;
        login_test_user(&client, "student@ruet.test").await;
        assert_eq!(me_status(&client).await, Status::Ok);

        let response = client.post("/api/logout").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(me_status(&client).await, Status::Unauthorized);
    }

    #[rocket::async_test]
    async fn test_expired_session_is_rejected() {
        let test_db = create_standard_test_db().await;
        let user_id = test_db.user_id("student@ruet.test").unwrap();
        let expired = (Utc::now() - Duration::hours(1)).naive_utc();
        create_user_session(&test_db.pool, user_id, "expired-token", expired)
            .await
            .unwrap();

        let (client, _, _) = setup_test_client(test_db).await;

        let response = client
            .get("/api/me")
            .private_cookie(Cookie::new(SESSION_COOKIE, "expired-token"))
            .private_cookie(Cookie::new(USER_ID_COOKIE, user_id.to_string()))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Unauthorized);

        let body: Value = response.into_json().await.expect("catcher json");
        assert_eq!(body["errors"]["authentication"][0], "Authentication required");
    }

    #[rocket::async_test]
    async fn test_profile_section_follows_roll() {
        let (client, _, _) = setup_test_client(create_standard_test_db().await).await;
        login_test_user(&client, "student@ruet.test").await;

        let response = client
            .put("/api/profile")
            .header(ContentType::JSON)
            .body(
                json!({
                    "studentName": "  Student One  ",
                    "studentRoll": "2201130",
                    "section": "A",
                    "departmentName": "Electrical & Electronic Engineering (EEE)"
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        let profile: Value = response.into_json().await.expect("profile json");
        assert_eq!(profile["studentName"], "Student One");
        assert_eq!(profile["section"], "C");

        let fetched: Value = client
            .get("/api/profile")
            .dispatch()
            .await
            .into_json()
            .await
            .expect("profile json");
        assert_eq!(fetched["studentRoll"], "2201130");
        assert_eq!(fetched["section"], "C");
    }

    #[rocket::async_test]
    async fn test_profile_keeps_section_for_unclassified_roll() {
        let (client, _, _) = setup_test_client(create_standard_test_db().await).await;
        login_test_user(&client, "student@ruet.test").await;

        let profile: Value = client
            .put("/api/profile")
            .header(ContentType::JSON)
            .body(json!({ "studentRoll": "12", "section": "B" }).to_string())
            .dispatch()
            .await
            .into_json()
            .await
            .expect("profile json");
        assert_eq!(profile["section"], "B");
    }

    #[rocket::async_test]
    async fn test_interleaved_guards_resolve_independently() {
        let (member, test_db, _) = setup_test_client(create_standard_test_db().await).await;
        let (anonymous, _, _) = setup_test_client(test_db).await;
        login_test_user(&member, "student@ruet.test").await;

        let (signed_in, signed_out) = rocket::tokio::join!(
            member.get("/api/me").dispatch(),
            anonymous.get("/api/me").dispatch()
        );
        assert_eq!(signed_in.status(), Status::Ok);
        assert_eq!(signed_out.status(), Status::Unauthorized);

        let me: Value = signed_in.into_json().await.expect("me json");
        assert_eq!(me["profile"]["email"], "student@ruet.test");
    }
}
