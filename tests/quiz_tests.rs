// tests/quiz_tests.rs

mod common;

use common::spawn_app;
use serde_json::{Value, json};

const WALK: &str = "ai-quiz-walk";
const ESCAPE: &str = "escape-room";

#[tokio::test]
async fn create_quiz_returns_questions_and_session() {
    let app = spawn_app().await;
    let (team_id, token) = app.team("creator").await;

    let response = app
        .post_json(
            "/api/ai-quiz-walk/quiz/create",
            Some(&token),
            &json!({ "topic": "Old harbor", "difficulty": "medium", "count": 3 }),
        )
        .await;

    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    let questions = body["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 3);
    assert_eq!(questions[0]["options"].as_array().unwrap().len(), 4);
    assert_eq!(questions[0]["answer"], "Beta 1");
    assert_eq!(body["storageKey"], "ai-quiz-walk-session");
    assert_eq!(body["session"]["variant"], WALK);
    assert_eq!(body["session"]["teamId"], team_id);
    assert_eq!(body["session"]["items"].as_array().unwrap().len(), 3);

    // Nothing is persisted by generation.
    let stored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(stored, 0);
}

#[tokio::test]
async fn session_is_capped_at_seven_questions() {
    let app = spawn_app().await;
    let (_, token) = app.team("capped").await;

    let first: Value = app
        .post_json(
            "/api/escape-room/quiz/create",
            Some(&token),
            &json!({ "topic": "Castle", "difficulty": "easy" }),
        )
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(first["questions"].as_array().unwrap().len(), 5);

    // Only two slots left; already-asked questions are not repeated.
    let second: Value = app
        .post_json(
            "/api/escape-room/quiz/create",
            Some(&token),
            &json!({ "topic": "Castle", "difficulty": "easy", "session": first["session"] }),
        )
        .await
        .json()
        .await
        .unwrap();
    let new_questions = second["questions"].as_array().unwrap();
    assert_eq!(new_questions.len(), 2);
    assert_eq!(new_questions[0]["question"], "Stub question 6");
    assert_eq!(second["session"]["sessionId"], first["session"]["sessionId"]);
    assert_eq!(second["session"]["items"].as_array().unwrap().len(), 7);

    let third = app
        .post_json(
            "/api/escape-room/quiz/create",
            Some(&token),
            &json!({ "topic": "Castle", "difficulty": "easy", "session": second["session"] }),
        )
        .await;
    assert_eq!(third.status().as_u16(), 400);
}

#[tokio::test]
async fn create_quiz_validates_input_and_auth() {
    let app = spawn_app().await;
    let (_, token) = app.team("validate").await;

    let bad_difficulty = app
        .post_json(
            "/api/ai-quiz-walk/quiz/create",
            Some(&token),
            &json!({ "topic": "Harbor", "difficulty": "nightmare" }),
        )
        .await;
    let anonymous = app
        .post_json(
            "/api/ai-quiz-walk/quiz/create",
            None,
            &json!({ "topic": "Harbor", "difficulty": "easy" }),
        )
        .await;

    assert_eq!(bad_difficulty.status().as_u16(), 400);
    assert_eq!(anonymous.status().as_u16(), 401);
}

#[tokio::test]
async fn save_enforces_minimum_batch() {
    let app = spawn_app().await;
    let (_, token) = app.team("tiny").await;

    let questions: Vec<Value> = (0..4)
        .map(|i| {
            json!({
                "topic": "Old town",
                "difficulty": "easy",
                "question": format!("Q{}", i),
                "options": ["a", "b", "c", "d"],
                "answer": "a",
            })
        })
        .collect();

    let response = app
        .post_json("/api/ai-quiz-walk/quiz/save", Some(&token), &json!({ "questions": questions }))
        .await;

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn save_rejects_whole_batch_on_one_bad_question() {
    let app = spawn_app().await;
    let (_, token) = app.team("badbatch").await;

    let mut questions: Vec<Value> = (0..5)
        .map(|i| {
            json!({
                "topic": "Old town",
                "difficulty": "easy",
                "question": format!("Q{}", i),
                "options": ["a", "b", "c", "d"],
                "answer": "a",
            })
        })
        .collect();
    questions[3]["answer"] = json!("not an option");

    let response = app
        .post_json("/api/ai-quiz-walk/quiz/save", Some(&token), &json!({ "questions": questions }))
        .await;

    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().starts_with("Question 4:"));
    let stored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(stored, 0);
}

#[tokio::test]
async fn saved_questions_are_listed_with_qr_payloads() {
    let app = spawn_app().await;
    let (team_id, token) = app.team("lister").await;
    let (_, other_token) = app.team("other").await;

    let ids = app.save_questions(WALK, &token, 5).await;
    app.save_questions(WALK, &other_token, 5).await;

    let listed: Vec<Value> = app
        .get("/api/ai-quiz-walk/quiz/list", Some(&token))
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(listed.len(), 5);
    assert!(listed.iter().all(|q| q["teamId"] == team_id));
    assert!(listed.iter().all(|q| q["answer"] == "East"));
    // Hints are dropped outside the escape room.
    assert!(listed.iter().all(|q| q["nextLocation"].is_null()));
    assert_eq!(
        listed[0]["qrPayload"],
        format!("http://quiz.test/ai-quiz-walk/quiz/{}", ids.iter().max().unwrap())
    );

    // The other variant has none of them.
    let escape: Vec<Value> = app
        .get("/api/escape-room/quiz/list", Some(&token))
        .await
        .json()
        .await
        .unwrap();
    assert!(escape.is_empty());
}

#[tokio::test]
async fn qr_lookup_is_public_and_hides_the_answer() {
    let app = spawn_app().await;
    let (_, token) = app.team("author").await;
    let ids = app.save_questions(WALK, &token, 5).await;

    let response = app.get(&format!("/api/ai-quiz-walk/quiz/qr/{}", ids[0]), None).await;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();

    assert_eq!(body["id"], ids[0]);
    assert!(body.get("answer").is_none());
    assert_eq!(body["options"].as_array().unwrap().len(), 4);
    assert!(body["authorTeamName"].as_str().unwrap().starts_with("author_"));

    let wrong_variant = app.get(&format!("/api/escape-room/quiz/qr/{}", ids[0]), None).await;
    assert_eq!(wrong_variant.status().as_u16(), 404);

    let missing = app.get("/api/ai-quiz-walk/quiz/qr/999999", None).await;
    assert_eq!(missing.status().as_u16(), 404);

    let not_a_number = app.get("/api/ai-quiz-walk/quiz/qr/abc", None).await;
    assert_eq!(not_a_number.status().as_u16(), 400);
}

#[tokio::test]
async fn repeated_scans_record_once() {
    let app = spawn_app().await;
    let (_, author) = app.team("author").await;
    let (scanner_id, scanner) = app.team("scanner").await;
    let ids = app.save_questions(WALK, &author, 5).await;

    let first: Value = app
        .post_json("/api/ai-quiz-walk/quiz/qr/scan", Some(&scanner), &json!({ "qrId": ids[0] }))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(first["recorded"], true);
    assert_eq!(first["ignored"], false);
    assert_eq!(first["foundCount"], 1);

    for _ in 0..3 {
        let again: Value = app
            .post_json("/api/ai-quiz-walk/quiz/qr/scan", Some(&scanner), &json!({ "qrId": ids[0] }))
            .await
            .json()
            .await
            .unwrap();
        assert_eq!(again["recorded"], false);
        assert_eq!(again["foundCount"], 1);
    }

    // A numeric string counts as the same id.
    let as_string: Value = app
        .post_json(
            "/api/ai-quiz-walk/quiz/qr/scan",
            Some(&scanner),
            &json!({ "qrId": ids[1].to_string() }),
        )
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(as_string["recorded"], true);
    assert_eq!(as_string["foundCount"], 2);

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quiz_scans WHERE id = ?")
        .bind(format!("{}:{}", scanner_id, ids[0]))
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn self_scan_is_ignored() {
    let app = spawn_app().await;
    let (author_id, author) = app.team("selfie").await;
    let ids = app.save_questions(WALK, &author, 5).await;

    let response: Value = app
        .post_json("/api/ai-quiz-walk/quiz/qr/scan", Some(&author), &json!({ "qrId": ids[0] }))
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(response["ignored"], true);
    assert_eq!(response["reason"], "self");
    assert_eq!(response["recorded"], false);
    assert_eq!(response["foundCount"], 0);

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quiz_scans WHERE team_id = ?")
        .bind(author_id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(rows, 0);
}

#[tokio::test]
async fn scan_input_errors() {
    let app = spawn_app().await;
    let (_, token) = app.team("sloppy").await;

    let missing = app
        .post_json("/api/ai-quiz-walk/quiz/qr/scan", Some(&token), &json!({}))
        .await;
    let not_numeric = app
        .post_json("/api/ai-quiz-walk/quiz/qr/scan", Some(&token), &json!({ "qrId": "forty-two" }))
        .await;
    let unknown = app
        .post_json("/api/ai-quiz-walk/quiz/qr/scan", Some(&token), &json!({ "qrId": 42 }))
        .await;
    let anonymous = app
        .post_json("/api/ai-quiz-walk/quiz/qr/scan", None, &json!({ "qrId": 42 }))
        .await;

    assert_eq!(missing.status().as_u16(), 400);
    assert_eq!(not_numeric.status().as_u16(), 400);
    assert_eq!(unknown.status().as_u16(), 404);
    assert_eq!(anonymous.status().as_u16(), 401);
}

#[tokio::test]
async fn first_attempt_wins() {
    let app = spawn_app().await;
    let (_, author) = app.team("author").await;
    let (solver_id, solver) = app.team("solver").await;
    let ids = app.save_questions(WALK, &author, 5).await;

    let wrong: Value = app
        .post_json(
            "/api/ai-quiz-walk/quiz/attempt",
            Some(&solver),
            &json!({ "questionIdx": ids[0], "answer": "North" }),
        )
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(wrong["correct"], false);
    assert_eq!(wrong["recorded"], true);
    assert_eq!(wrong["firstCorrect"], false);
    assert_eq!(wrong["attemptCount"], 1);
    assert_eq!(wrong["solvedCount"], 0);

    let right: Value = app
        .post_json(
            "/api/ai-quiz-walk/quiz/attempt",
            Some(&solver),
            &json!({ "questionIdx": ids[0], "answer": "east" }),
        )
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(right["correct"], true);
    assert_eq!(right["recorded"], false);
    assert_eq!(right["firstCorrect"], false);
    assert_eq!(right["solvedCount"], 0);

    let other: Value = app
        .post_json(
            "/api/ai-quiz-walk/quiz/attempt",
            Some(&solver),
            &json!({ "questionIdx": ids[1].to_string(), "answer": "East" }),
        )
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(other["firstCorrect"], true);
    assert_eq!(other["solvedCount"], 1);
    assert_eq!(other["attemptCount"], 2);

    let stored: bool = sqlx::query_scalar("SELECT is_correct FROM quiz_attempts WHERE id = ?")
        .bind(format!("{}:{}", solver_id, ids[0]))
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert!(!stored);
}

#[tokio::test]
async fn self_attempt_is_graded_but_not_counted() {
    let app = spawn_app().await;
    let (_, author) = app.team("author").await;
    let ids = app.save_questions(WALK, &author, 5).await;

    let response: Value = app
        .post_json(
            "/api/ai-quiz-walk/quiz/attempt",
            Some(&author),
            &json!({ "questionIdx": ids[0], "answer": "East" }),
        )
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(response["correct"], true);
    assert_eq!(response["ignored"], true);
    assert_eq!(response["reason"], "self");
    assert_eq!(response["solvedCount"], 0);

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quiz_attempts")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(rows, 0);
}

#[tokio::test]
async fn attempt_input_errors() {
    let app = spawn_app().await;
    let (_, author) = app.team("author").await;
    let (_, solver) = app.team("solver").await;
    let ids = app.save_questions(WALK, &author, 5).await;

    let no_answer = app
        .post_json(
            "/api/ai-quiz-walk/quiz/attempt",
            Some(&solver),
            &json!({ "questionIdx": ids[0], "answer": "  " }),
        )
        .await;
    let bad_id = app
        .post_json(
            "/api/ai-quiz-walk/quiz/attempt",
            Some(&solver),
            &json!({ "questionIdx": [1], "answer": "East" }),
        )
        .await;

    assert_eq!(no_answer.status().as_u16(), 400);
    assert_eq!(bad_id.status().as_u16(), 400);
}

#[tokio::test]
async fn escape_room_reveals_next_location_after_correct_first_attempt() {
    let app = spawn_app().await;
    let (_, author) = app.team("keeper").await;
    let (_, player) = app.team("player").await;
    let ids = app.save_questions(ESCAPE, &author, 5).await;

    let solved: Value = app
        .post_json(
            "/api/escape-room/quiz/attempt",
            Some(&player),
            &json!({ "questionIdx": ids[2], "answer": "East" }),
        )
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(solved["nextLocation"], "Behind statue 2");

    let missed: Value = app
        .post_json(
            "/api/escape-room/quiz/attempt",
            Some(&player),
            &json!({ "questionIdx": ids[3], "answer": "West" }),
        )
        .await
        .json()
        .await
        .unwrap();
    assert!(missed.get("nextLocation").is_none());
}

#[tokio::test]
async fn only_the_author_sets_next_location() {
    let app = spawn_app().await;
    let (_, author) = app.team("keeper").await;
    let (_, stranger) = app.team("stranger").await;
    let ids = app.save_questions(ESCAPE, &author, 5).await;
    let path = format!("/api/escape-room/quiz/{}/next-location", ids[0]);

    let by_author = app
        .client
        .put(app.url(&path))
        .bearer_auth(&author)
        .json(&json!({ "nextLocation": "Under the old bell" }))
        .send()
        .await
        .unwrap();
    assert_eq!(by_author.status().as_u16(), 200);

    let by_stranger = app
        .client
        .put(app.url(&path))
        .bearer_auth(&stranger)
        .json(&json!({ "nextLocation": "Nowhere" }))
        .send()
        .await
        .unwrap();
    assert_eq!(by_stranger.status().as_u16(), 403);

    let stored: Option<String> = sqlx::query_scalar("SELECT next_location FROM questions WHERE id = ?")
        .bind(ids[0])
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(stored.as_deref(), Some("Under the old bell"));

    // The walking tour has no such route.
    let walk = app
        .client
        .put(app.url(&format!("/api/ai-quiz-walk/quiz/{}/next-location", ids[0])))
        .bearer_auth(&author)
        .json(&json!({ "nextLocation": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(walk.status().as_u16(), 404);
}

#[tokio::test]
async fn ranking_orders_by_solved_then_found() {
    let app = spawn_app().await;
    let (_, author) = app.team("author").await;
    let (fast_id, fast) = app.team("fast").await;
    let (slow_id, slow) = app.team("slow").await;
    let ids = app.save_questions(WALK, &author, 5).await;

    for id in &ids[..2] {
        app.post_json("/api/ai-quiz-walk/quiz/qr/scan", Some(&fast), &json!({ "qrId": id }))
            .await;
        app.post_json(
            "/api/ai-quiz-walk/quiz/attempt",
            Some(&fast),
            &json!({ "questionIdx": id, "answer": "East" }),
        )
        .await;
    }
    for id in &ids[..3] {
        app.post_json("/api/ai-quiz-walk/quiz/qr/scan", Some(&slow), &json!({ "qrId": id }))
            .await;
    }

    let ranking: Vec<Value> = app.get("/api/ai-quiz-walk/ranking", None).await.json().await.unwrap();

    assert_eq!(ranking[0]["teamId"], fast_id);
    assert_eq!(ranking[0]["solvedCount"], 2);
    assert_eq!(ranking[0]["foundCount"], 2);
    assert_eq!(ranking[1]["teamId"], slow_id);
    assert_eq!(ranking[1]["foundCount"], 3);
    let author_row = ranking.iter().find(|r| r["authoredCount"] == 5).unwrap();
    assert_eq!(author_row["foundCount"], 0);

    // Counts are per variant.
    let escape: Vec<Value> = app.get("/api/escape-room/ranking", None).await.json().await.unwrap();
    assert!(escape.iter().all(|r| r["foundCount"] == 0 && r["solvedCount"] == 0));
}

fn dish_questions() -> Vec<Value> {
    (0..5)
        .map(|i| {
            json!({
                "topic": "Market",
                "difficulty": "easy",
                "question": format!("Which stall sells dish {} & more?", i),
                "options": ["Fish & Chips", "Soup <hot>", r#"The "Old" Bakery"#, "Rice"],
                "answer": "Fish & Chips",
            })
        })
        .collect()
}

#[tokio::test]
async fn options_with_special_characters_round_trip_as_plain_text() {
    let app = spawn_app().await;
    let (_, author) = app.team("market").await;
    let (_, solver) = app.team("hungry").await;

    let saved = app
        .post_json(
            "/api/ai-quiz-walk/quiz/save",
            Some(&author),
            &json!({ "questions": dish_questions() }),
        )
        .await;
    assert_eq!(saved.status().as_u16(), 201);
    let saved: Value = saved.json().await.unwrap();
    let ids: Vec<i64> = saved["ids"].as_array().unwrap().iter().map(|v| v.as_i64().unwrap()).collect();

    let public: Value = app
        .get(&format!("/api/ai-quiz-walk/quiz/qr/{}", ids[0]), None)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(public["options"][0], "Fish & Chips");
    assert_eq!(public["options"][2], r#"The "Old" Bakery"#);
    assert_eq!(public["question"], "Which stall sells dish 0 & more?");

    let attempt: Value = app
        .post_json(
            "/api/ai-quiz-walk/quiz/attempt",
            Some(&solver),
            &json!({ "questionIdx": ids[0], "answer": "Fish & Chips" }),
        )
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(attempt["correct"], true);
    assert_eq!(attempt["firstCorrect"], true);
    assert_eq!(attempt["solvedCount"], 1);

    let quoted: Value = app
        .post_json(
            "/api/ai-quiz-walk/quiz/attempt",
            Some(&solver),
            &json!({ "questionIdx": ids[1], "answer": r#"The "Old" Bakery"# }),
        )
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(quoted["correct"], false);
    assert_eq!(quoted["recorded"], true);
}

#[tokio::test]
async fn malformed_attempt_body_is_400() {
    let app = spawn_app().await;
    let (_, author) = app.team("author").await;
    let (_, solver) = app.team("solver").await;
    let ids = app.save_questions(WALK, &author, 5).await;

    let numeric_answer = app
        .post_json(
            "/api/ai-quiz-walk/quiz/attempt",
            Some(&solver),
            &json!({ "questionIdx": ids[0], "answer": 2 }),
        )
        .await;
    assert_eq!(numeric_answer.status().as_u16(), 400);
    let body: Value = numeric_answer.json().await.unwrap();
    assert!(body["error"].is_string());

    let wrong_shape = app
        .post_json("/api/ai-quiz-walk/quiz/save", Some(&author), &json!({ "questions": "all of them" }))
        .await;
    assert_eq!(wrong_shape.status().as_u16(), 400);

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quiz_attempts")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(rows, 0);
}
