mod common;

use common::*;
use serde_json::{json, Value};

#[tokio::test]
async fn admin_endpoints_require_admin_tier() {
    let app = spawn_app().await;
    let alice = client();
    register(&app, &alice, "alice", "permanent").await;

    let response = alice.get(app.url("/api/admin/users")).send().await.unwrap();
    assert_eq!(response.status(), 403);

    let anonymous = client();
    let response = anonymous
        .get(app.url("/api/admin/users"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn admin_lists_and_searches_users_without_hashes() {
    let app = spawn_app().await;
    let alice = client();
    register(&app, &alice, "alice", "permanent").await;
    let admin = admin_client(&app).await;

    let users: Value = admin
        .get(app.url("/api/admin/users"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let all = users.as_array().unwrap();
    assert!(all.iter().any(|u| u["username"] == "alice"));
    for user in all {
        assert!(user.get("passwordHash").is_none());
        assert!(user.get("password_hash").is_none());
    }

    let users: Value = admin
        .get(app.url("/api/admin/users"))
        .query(&[("search", "ALI")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let filtered = users.as_array().unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0]["username"], "alice");

    // A wildcard in the search string is a literal, not match-all
    let users: Value = admin
        .get(app.url("/api/admin/users"))
        .query(&[("search", "%")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(users.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn disabling_a_user_invalidates_their_session() {
    let app = spawn_app().await;
    let alice = client();
    register(&app, &alice, "alice", "permanent").await;
    let admin = admin_client(&app).await;

    let users: Value = admin
        .get(app.url("/api/admin/users"))
        .query(&[("search", "alice")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let alice_id = users[0]["id"].as_str().unwrap().to_string();

    let response = admin
        .post(app.url("/api/admin/disable-user"))
        .json(&json!({ "userId": alice_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // Alice's next authenticated request fails and her session is gone
    let response = alice.get(app.url("/api/check-auth")).send().await.unwrap();
    assert_eq!(response.status(), 401);

    // She cannot log back in while disabled
    let response = login(&app, &client(), "alice", TEST_PASSWORD).await;
    assert_eq!(response.status(), 401);

    // Re-enabling restores login
    let response = admin
        .post(app.url("/api/admin/enable-user"))
        .json(&json!({ "userId": alice_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let response = login(&app, &client(), "alice", TEST_PASSWORD).await;
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn maintenance_mode_redirects_pages_but_not_api() {
    let app = spawn_app().await;
    let admin = admin_client(&app).await;

    let response = admin
        .post(app.url("/api/admin/toggle-maintenance"))
        .json(&json!({ "enabled": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // Anonymous page requests are redirected to the maintenance page
    let anonymous = client();
    let response = anonymous.get(app.url("/")).send().await.unwrap();
    assert!(response.status().is_redirection());
    assert_eq!(
        response.headers().get("location").unwrap(),
        "/maintenance.html"
    );

    // The maintenance page itself still serves
    let response = anonymous
        .get(app.url("/maintenance.html"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // API routes are unaffected: login still works
    let alice = client();
    let response = alice
        .post(app.url("/api/register"))
        .json(&json!({ "username": "alice", "password": TEST_PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // Admins bypass the gate entirely
    let response = admin.get(app.url("/dashboard.html")).send().await.unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn shutdown_mode_redirects_every_page_offsite() {
    let app = spawn_app().await;
    let admin = admin_client(&app).await;

    admin
        .post(app.url("/api/admin/toggle-shutdown"))
        .json(&json!({ "enabled": true }))
        .send()
        .await
        .unwrap();

    let anonymous = client();
    for path in ["/", "/dashboard.html", "/maintenance.html"] {
        let response = anonymous.get(app.url(path)).send().await.unwrap();
        assert!(
            response.status().is_redirection(),
            "expected redirect from {}",
            path
        );
        let location = response.headers().get("location").unwrap();
        assert_eq!(location, "https://www.stjude.org/");
    }

    // Toggling back off restores the pages
    admin
        .post(app.url("/api/admin/toggle-shutdown"))
        .json(&json!({ "enabled": false }))
        .send()
        .await
        .unwrap();
    let response = anonymous.get(app.url("/")).send().await.unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn site_settings_singleton_reads_back_toggles() {
    let app = spawn_app().await;
    let admin = admin_client(&app).await;

    let settings: Value = admin
        .get(app.url("/api/admin/site-settings"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(settings["shutdownMode"], false);
    assert_eq!(settings["maintenanceMode"], false);

    admin
        .post(app.url("/api/admin/toggle-maintenance"))
        .json(&json!({ "enabled": true }))
        .send()
        .await
        .unwrap();

    let settings: Value = admin
        .get(app.url("/api/admin/site-settings"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(settings["maintenanceMode"], true);
    assert!(settings["updatedBy"].is_string());
}

#[tokio::test]
async fn report_lifecycle_through_admin() {
    let app = spawn_app().await;
    let alice = client();
    register(&app, &alice, "alice", "permanent").await;

    let body: Value = alice
        .post(app.url("/api/submit-report"))
        .json(&json!({
            "reportType": "technical_issue",
            "urgencyLevel": "low",
            "description": "The proxy page renders blank after login",
            "timeOfIncident": "2026-03-01T09:15",
            "witnessPresent": false,
            "actionTaken": "reloaded the page",
            "deviceType": "school chromebook"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let report_id = body["reportId"].as_str().unwrap().to_string();

    let admin = admin_client(&app).await;
    let reports: Value = admin
        .get(app.url("/api/admin/reports"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let listed = reports.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["reportId"], report_id.as_str());
    assert_eq!(listed[0]["reportedBy"]["username"], "alice");
    assert_eq!(listed[0]["status"], "pending");

    // Status transition by the human-readable token
    let response = admin
        .post(app.url("/api/admin/update-report"))
        .json(&json!({
            "reportId": report_id,
            "status": "resolved",
            "adminNotes": "fixed upstream"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let reports: Value = admin
        .get(app.url("/api/admin/reports"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(reports[0]["status"], "resolved");
    assert_eq!(reports[0]["adminNotes"], "fixed upstream");

    // Invalid status is rejected, unknown report is NotFound
    let response = admin
        .post(app.url("/api/admin/update-report"))
        .json(&json!({ "reportId": report_id, "status": "archived" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let response = admin
        .post(app.url("/api/admin/update-report"))
        .json(&json!({ "reportId": "RPT-0-XXXXX", "status": "reviewed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn entry_page_redirects_authenticated_users() {
    let app = spawn_app().await;
    let alice = client();
    register(&app, &alice, "alice", "permanent").await;

    let response = alice.get(app.url("/")).send().await.unwrap();
    assert!(response.status().is_redirection());
    assert_eq!(
        response.headers().get("location").unwrap(),
        "/dashboard.html"
    );

    // Anonymous users see the entry page and bounce off the dashboard
    let anonymous = client();
    let response = anonymous.get(app.url("/")).send().await.unwrap();
    assert_eq!(response.status(), 200);
    let response = anonymous
        .get(app.url("/dashboard.html"))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_redirection());
    assert_eq!(response.headers().get("location").unwrap(), "/");
}
