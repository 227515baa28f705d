// tests/common/mod.rs

#![allow(dead_code)]

use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use quizwalk::{
    ai::QuestionGenerator,
    config::{Config, parse_base_url},
    error::AppError,
    routes,
    state::AppState,
    utils::{hash::hash_password, jwt::ROLE_ADMIN},
};
use serde_json::{Value, json};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};

pub const JWT_SECRET: &str = "test_secret_for_integration_tests";
pub const PASSWORD: &str = "password123";

/// Always answers with the same seven questions, whatever the prompt.
pub struct StubGenerator;

#[async_trait]
impl QuestionGenerator for StubGenerator {
    async fn complete(&self, _prompt: &str) -> Result<String, AppError> {
        let questions: Vec<Value> = (1..=7)
            .map(|i| {
                json!({
                    "question": format!("Stub question {}", i),
                    "options": [format!("Alpha {}", i), format!("Beta {}", i), format!("Gamma {}", i), format!("Delta {}", i)],
                    "answer": format!("Beta {}", i),
                })
            })
            .collect();
        Ok(format!("```json\n{}\n```", Value::Array(questions)))
    }
}

pub struct TestApp {
    pub address: String,
    pub pool: SqlitePool,
    pub config: Config,
    pub client: reqwest::Client,
}

pub fn test_config(file_root: PathBuf) -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        jwt_renew_threshold: 60,
        rust_log: "error".to_string(),
        admin_username: None,
        admin_password: None,
        bind_addr: ([127, 0, 0, 1], 0).into(),
        public_base_url: parse_base_url("http://quiz.test").unwrap(),
        file_root,
        gemini_api_key: None,
        gemini_model: "stub".to_string(),
        gemini_base_url: "http://127.0.0.1:9".to_string(),
        cors_origins: vec!["http://localhost:3000".to_string()],
    }
}

/// Spawns the app on a random port with a fresh in-memory database.
pub async fn spawn_app() -> TestApp {
    spawn_app_with_files(std::env::temp_dir()).await
}

pub async fn spawn_app_with_files(file_root: PathBuf) -> TestApp {
    // One connection that never expires: the in-memory database lives as long as it does.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = test_config(file_root);

    let state = AppState {
        pool: pool.clone(),
        config: config.clone(),
        generator: Arc::new(StubGenerator),
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        pool,
        config,
        client: reqwest::Client::new(),
    }
}

pub fn unique_name(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().simple().to_string()[..8])
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn post_json(&self, path: &str, token: Option<&str>, body: &Value) -> reqwest::Response {
        let mut request = self.client.post(self.url(path)).json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.expect("Failed to execute request")
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> reqwest::Response {
        let mut request = self.client.get(self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.expect("Failed to execute request")
    }

    pub async fn signup(&self, team_name: &str) -> reqwest::Response {
        self.post_json(
            "/api/auth/user/signup",
            None,
            &json!({ "teamName": team_name, "password": PASSWORD }),
        )
        .await
    }

    pub async fn login(&self, team_name: &str) -> Value {
        let response = self
            .post_json(
                "/api/auth/user/login",
                None,
                &json!({ "teamName": team_name, "password": PASSWORD }),
            )
            .await;
        assert_eq!(response.status().as_u16(), 200);
        response.json().await.expect("Failed to parse login json")
    }

    /// Signs up a fresh team and returns (team id, token).
    pub async fn team(&self, prefix: &str) -> (i64, String) {
        let name = unique_name(prefix);
        assert_eq!(self.signup(&name).await.status().as_u16(), 201);
        let login = self.login(&name).await;
        (
            login["teamId"].as_i64().unwrap(),
            login["token"].as_str().unwrap().to_string(),
        )
    }

    /// Inserts an admin account directly and logs in through the admin endpoint.
    pub async fn admin_token(&self) -> String {
        let name = unique_name("admin");
        sqlx::query("INSERT INTO users (team_name, password, role) VALUES (?, ?, ?)")
            .bind(&name)
            .bind(hash_password(PASSWORD).unwrap())
            .bind(ROLE_ADMIN)
            .execute(&self.pool)
            .await
            .unwrap();

        let response = self
            .post_json(
                "/api/auth/admin/login",
                None,
                &json!({ "teamName": name, "password": PASSWORD }),
            )
            .await;
        assert_eq!(response.status().as_u16(), 200);
        let body: Value = response.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    /// Saves `count` valid questions for the team and returns their ids.
    pub async fn save_questions(&self, variant: &str, token: &str, count: usize) -> Vec<i64> {
        let questions: Vec<Value> = (0..count)
            .map(|i| {
                json!({
                    "topic": "Old town",
                    "difficulty": "easy",
                    "question": format!("Which gate is number {}?", i),
                    "options": ["North", "South", "East", "West"],
                    "answer": "East",
                    "nextLocation": format!("Behind statue {}", i),
                })
            })
            .collect();

        let response = self
            .post_json(
                &format!("/api/{}/quiz/save", variant),
                Some(token),
                &json!({ "questions": questions }),
            )
            .await;
        assert_eq!(response.status().as_u16(), 201);
        let body: Value = response.json().await.unwrap();
        body["ids"]
            .as_array()
            .unwrap()
            .iter()
            .map(|id| id.as_i64().unwrap())
            .collect()
    }
}
