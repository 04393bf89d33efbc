use hallpass::config::Config;
use hallpass::db;
use hallpass::relay::Relay;
use hallpass::routes;
use hallpass::state::{AppState, DbPool};
use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;

pub const ADMIN_USERNAME: &str = "overseer";
pub const ADMIN_PASSWORD: &str = "admin-password";
pub const TEST_PASSWORD: &str = "password123";

pub struct TestApp {
    pub base_url: String,
    /// Direct handle to the app's database, for tests that need to
    /// manipulate or inspect rows behind the API's back.
    pub db: DbPool,
    _tmp: TempDir,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Spin up the real router on an ephemeral port with a fresh database
/// and a seeded admin account.
pub async fn spawn_app() -> TestApp {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("test.db");
    let pool = db::create_pool(&db_path).expect("Failed to create test database");
    db::run_migrations(&pool).expect("Failed to run migrations");
    db::seed_admin(&pool, ADMIN_USERNAME, ADMIN_PASSWORD).expect("Failed to seed admin");

    let mut config = Config::default();
    config.database.path = Some(db_path);

    let state = AppState {
        db: pool.clone(),
        config,
        relay: Relay::new(),
    };
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        base_url: format!("http://{}", addr),
        db: pool,
        _tmp: tmp,
    }
}

/// A client with its own cookie jar and no automatic redirects, so the
/// tests can observe the gate's redirect responses directly.
pub fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// Register a user and leave the session cookie in the client's jar.
pub async fn register(app: &TestApp, client: &Client, username: &str, account_type: &str) -> Value {
    let response = client
        .post(app.url("/api/register"))
        .json(&json!({
            "username": username,
            "password": TEST_PASSWORD,
            "accountType": account_type
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200, "registration of {} failed", username);
    response.json().await.unwrap()
}

pub async fn login(app: &TestApp, client: &Client, username: &str, password: &str) -> reqwest::Response {
    client
        .post(app.url("/api/login"))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await
        .unwrap()
}

/// Log the seeded admin in on a fresh client.
pub async fn admin_client(app: &TestApp) -> Client {
    let admin = client();
    let response = login(app, &admin, ADMIN_USERNAME, ADMIN_PASSWORD).await;
    assert_eq!(response.status(), 200, "admin login failed");
    admin
}

/// Look up another user's id the way the UI does: via search.
pub async fn find_user_id(app: &TestApp, client: &Client, username: &str) -> String {
    let body: Value = client
        .get(app.url("/api/search-users"))
        .query(&[("query", username)])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    body["users"]
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["username"] == username)
        .unwrap_or_else(|| panic!("user {} not found in search", username))["id"]
        .as_str()
        .unwrap()
        .to_string()
}
