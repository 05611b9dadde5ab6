//! Integration tests for the template engine HTTP API.

use std::sync::Arc;

use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::db::{init_database, Repository};
use crate::search::SearchIndex;
use crate::{create_router, AppState};

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");
        let index_path = temp_dir.path().join("index");

        // Initialize database
        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool));

        // Initialize search index
        let search = Arc::new(SearchIndex::open(&index_path).expect("Failed to init search"));

        let app = create_router(AppState::new(repo, search, 2.0));

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        TestFixture {
            client: Client::new(),
            base_url,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> (u16, Value) {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        let resp = self
            .client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    async fn put(&self, path: &str, body: Value) -> (u16, Value) {
        let resp = self
            .client
            .put(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    /// Create a template and return its id. Bodies without an `orgId` land in `org-1`.
    async fn create_template(&self, mut body: Value) -> String {
        if body.get("orgId").is_none() {
            body["orgId"] = json!("org-1");
        }
        let (status, body) = self.post("/api/templates", body).await;
        assert_eq!(status, 200, "create failed: {}", body);
        body["data"]["id"].as_str().unwrap().to_string()
    }
}

fn room_content(width: f64, platform: &str) -> Value {
    json!({
        "type": "room",
        "roomType": "conference",
        "width": width,
        "length": 15.0,
        "ceilingHeight": 9.0,
        "platform": platform,
        "ecosystem": "logitech",
        "tier": "standard",
        "placedEquipment": [
            { "equipmentId": "eq-rally-bar", "x": 10.0, "y": 1.0 },
            { "equipmentId": "eq-tap", "x": 10.0, "y": 7.0, "rotation": 90.0, "label": "Table" }
        ],
        "connections": []
    })
}

fn room_template(name: &str) -> Value {
    json!({
        "templateType": "room",
        "name": name,
        "description": "Mid-size conference room",
        "categoryTags": ["conference"],
        "orgId": "org-1",
        "content": room_content(20.0, "zoom"),
        "createdBy": "u1"
    })
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_template_crud() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .post("/api/templates", room_template("Conference A"))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["currentVersion"], 1);
    assert_eq!(body["data"]["scope"], "personal");
    assert_eq!(body["data"]["ownerId"], "u1");
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = fixture.get(&format!("/api/templates/{}/full", id)).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["name"], "Conference A");
    assert_eq!(body["data"]["currentVersionData"]["versionNumber"], 1);
    assert_eq!(body["data"]["currentVersionData"]["content"]["type"], "room");

    let (status, body) = fixture
        .put(
            &format!("/api/templates/{}", id),
            json!({ "name": "Conference B", "categoryTags": ["video"] }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["name"], "Conference B");
    assert_eq!(body["data"]["description"], "Mid-size conference room");
    assert_eq!(body["data"]["currentVersion"], 1);

    let (status, body) = fixture
        .put(&format!("/api/templates/{}", id), json!({ "description": null }))
        .await;
    assert_eq!(status, 200);
    assert!(body["data"].get("description").map_or(true, Value::is_null));
    assert_eq!(body["data"]["name"], "Conference B");

    let (status, body) = fixture.get("/api/templates").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let resp = fixture
        .client
        .delete(fixture.url(&format!("/api/templates/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let (status, body) = fixture.get(&format!("/api/templates/{}", id)).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, _) = fixture.get(&format!("/api/templates/{}/versions", id)).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_content_versions_and_restore() {
    let fixture = TestFixture::new().await;
    let id = fixture.create_template(room_template("Conference")).await;

    for width in [22.0, 24.0] {
        let (status, body) = fixture
            .put(
                &format!("/api/templates/{}/content", id),
                json!({
                    "content": room_content(width, "zoom"),
                    "changeSummary": format!("Widened to {}", width),
                    "createdBy": "u1"
                }),
            )
            .await;
        assert_eq!(status, 200, "{}", body);
    }

    let (_, body) = fixture.get(&format!("/api/templates/{}/versions", id)).await;
    let numbers: Vec<i64> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["versionNumber"].as_i64().unwrap())
        .collect();
    assert_eq!(numbers, vec![3, 2, 1]);

    let (status, body) = fixture
        .post(
            &format!("/api/templates/{}/versions/1/restore", id),
            json!({ "createdBy": "u2" }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["versionNumber"], 4);
    assert_eq!(body["data"]["changeSummary"], "Restored from version 1");
    assert_eq!(body["data"]["content"]["width"], 20.0);

    let (_, body) = fixture
        .get(&format!("/api/templates/{}/versions/current", id))
        .await;
    assert_eq!(body["data"]["versionNumber"], 4);

    let (_, body) = fixture
        .get(&format!("/api/templates/{}/versions/2", id))
        .await;
    assert_eq!(body["data"]["content"]["width"], 22.0);

    let (status, body) = fixture
        .get(&format!("/api/templates/{}/versions/99", id))
        .await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_stale_expected_version_is_rejected() {
    let fixture = TestFixture::new().await;
    let id = fixture.create_template(room_template("Conference")).await;

    let save = |expected: i64| {
        json!({
            "content": room_content(30.0, "teams"),
            "createdBy": "u1",
            "expectedVersion": expected
        })
    };

    let (status, _) = fixture
        .put(&format!("/api/templates/{}/content", id), save(1))
        .await;
    assert_eq!(status, 200);

    let (status, body) = fixture
        .put(&format!("/api/templates/{}/content", id), save(1))
        .await;
    assert_eq!(status, 409);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VERSION_MISMATCH");
    assert_eq!(body["error"]["details"]["currentVersion"], 2);
}

#[tokio::test]
async fn test_validation_errors() {
    let fixture = TestFixture::new().await;

    // Content type disagrees with the template type
    let mut body = room_template("Mismatch");
    body["templateType"] = json!("quote");
    let (status, resp) = fixture.post("/api/templates", body).await;
    assert_eq!(status, 400);
    assert_eq!(resp["error"]["code"], "VALIDATION_ERROR");

    // Blank name
    let (status, _) = fixture.post("/api/templates", room_template("  ")).await;
    assert_eq!(status, 400);

    // Team scope without a team
    let mut body = room_template("Team Room");
    body["scope"] = json!("team");
    let (status, _) = fixture.post("/api/templates", body).await;
    assert_eq!(status, 400);

    // Every non-system template belongs to an organization
    let mut body = room_template("Loose Room");
    body.as_object_mut().unwrap().remove("orgId");
    let (status, resp) = fixture.post("/api/templates", body).await;
    assert_eq!(status, 400);
    assert_eq!(resp["error"]["code"], "VALIDATION_ERROR");

    // A package that expands past the placement limit
    let (status, _) = fixture
        .post(
            "/api/templates",
            json!({
                "templateType": "equipment_package",
                "name": "Warehouse",
                "orgId": "org-1",
                "content": {
                    "type": "equipment_package",
                    "category": "Audio",
                    "items": [{ "equipmentId": "eq-mic", "quantity": 4000000000u32 }]
                },
                "createdBy": "u1"
            }),
        )
        .await;
    assert_eq!(status, 400);

    // Apply a room template without a project
    let id = fixture.create_template(room_template("Conference")).await;
    let (status, resp) = fixture
        .post(
            &format!("/api/templates/{}/apply", id),
            json!({ "name": "Room A" }),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(resp["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_fork_promote_and_system_templates() {
    let fixture = TestFixture::new().await;
    let id = fixture.create_template(room_template("Conference")).await;

    let (status, body) = fixture
        .post(
            &format!("/api/templates/{}/fork", id),
            json!({ "name": "My Conference", "createdBy": "u2" }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["forkedFromId"], id.as_str());
    assert_eq!(body["data"]["ownerId"], "u2");
    assert_eq!(body["data"]["orgId"], "org-1");
    assert_eq!(body["data"]["isPublished"], false);

    let (status, _) = fixture
        .post(
            &format!("/api/templates/{}/fork", id),
            json!({ "name": "Fake Reference", "scope": "system", "createdBy": "u2" }),
        )
        .await;
    assert_eq!(status, 400);

    let (status, body) = fixture
        .post(
            &format!("/api/templates/{}/promote", id),
            json!({ "scope": "org" }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["scope"], "org");
    assert_eq!(body["data"]["orgId"], "org-1");
    assert!(body["data"].get("ownerId").is_none());

    let (status, _) = fixture
        .post(
            &format!("/api/templates/{}/promote", id),
            json!({ "scope": "team", "teamId": "t1" }),
        )
        .await;
    assert_eq!(status, 400);

    let mut system = room_template("Reference Boardroom");
    system["scope"] = json!("system");
    let system_id = fixture.create_template(system).await;

    let (status, body) = fixture
        .post(&format!("/api/templates/{}/archive", system_id), json!({}))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) = fixture
        .post(
            &format!("/api/templates/{}/duplicate", system_id),
            json!({ "name": "Boardroom Copy", "orgId": "org-2", "createdBy": "u3" }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["scope"], "personal");
    assert_eq!(body["data"]["ownerId"], "u3");
    assert_eq!(body["data"]["orgId"], "org-2");
}

#[tokio::test]
async fn test_list_filters() {
    let fixture = TestFixture::new().await;
    fixture.create_template(room_template("Zoom Conference")).await;

    let mut teams = room_template("Teams Boardroom");
    teams["content"] = room_content(25.0, "teams");
    teams["isPublished"] = json!(true);
    let teams_id = fixture.create_template(teams).await;

    fixture
        .create_template(json!({
            "templateType": "equipment_package",
            "name": "Zoom Audio Kit",
            "content": {
                "type": "equipment_package",
                "category": "Audio",
                "items": [{ "equipmentId": "eq-mic", "quantity": 2 }],
                "totalEstimatedCost": 1200.0
            },
            "createdBy": "u1"
        }))
        .await;

    let names = |body: &Value| -> Vec<String> {
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap().to_string())
            .collect()
    };

    let (_, body) = fixture.get("/api/templates?platform=teams").await;
    assert_eq!(names(&body), vec!["Teams Boardroom"]);

    let (_, body) = fixture.get("/api/templates?isPublished=true").await;
    assert_eq!(body["data"][0]["id"], teams_id.as_str());

    let (_, body) = fixture.get("/api/templates?type=room").await;
    assert_eq!(names(&body), vec!["Teams Boardroom", "Zoom Conference"]);

    let (_, body) = fixture.get("/api/templates?search=zoom").await;
    assert_eq!(names(&body), vec!["Zoom Audio Kit", "Zoom Conference"]);

    let (_, body) = fixture.get("/api/templates?tier=standard&type=equipment_package").await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_apply_project_template() {
    let fixture = TestFixture::new().await;
    let room_id = fixture.create_template(room_template("Huddle")).await;
    let project_id = fixture
        .create_template(json!({
            "templateType": "project",
            "name": "Office Floor",
            "content": {
                "type": "project",
                "rooms": [
                    { "templateId": room_id, "defaultName": "Huddle", "quantity": 3 },
                    { "templateId": "missing", "defaultName": "Ghost", "quantity": 1 }
                ],
                "clientDefaults": {},
                "defaultMargins": { "equipmentPercent": 30.0, "laborPercent": 20.0 }
            },
            "createdBy": "u1"
        }))
        .await;

    let (status, body) = fixture
        .post(
            &format!("/api/templates/{}/apply", project_id),
            json!({ "name": "HQ", "clientName": "Acme", "createdBy": "u1" }),
        )
        .await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["data"]["type"], "project");
    let created_project = body["data"]["projectId"].as_str().unwrap().to_string();

    let (_, body) = fixture
        .get(&format!("/api/projects/{}", created_project))
        .await;
    assert_eq!(body["data"]["name"], "HQ");
    assert_eq!(body["data"]["clientName"], "Acme");

    let (_, body) = fixture
        .get(&format!("/api/projects/{}/rooms", created_project))
        .await;
    let rooms = body["data"].as_array().unwrap();
    let names: Vec<&str> = rooms.iter().map(|r| r["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Huddle 1", "Huddle 2", "Huddle 3"]);
    for room in rooms {
        let placements = room["placedEquipment"].as_array().unwrap();
        assert_eq!(placements.len(), 2);
        assert!(placements[0]["id"].as_str().unwrap().starts_with("pe-"));
        assert_eq!(placements[1]["label"], "Table");
    }
}

#[tokio::test]
async fn test_apply_room_then_package_then_quote() {
    let fixture = TestFixture::new().await;
    let room_template_id = fixture.create_template(room_template("Conference")).await;

    let (status, body) = fixture
        .post(
            &format!("/api/templates/{}/apply", room_template_id),
            json!({ "name": "Room A", "projectId": "p-1" }),
        )
        .await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["data"]["type"], "room");
    let room_id = body["data"]["roomId"].as_str().unwrap().to_string();

    let package_id = fixture
        .create_template(json!({
            "templateType": "equipment_package",
            "name": "Ceiling Mics",
            "content": {
                "type": "equipment_package",
                "category": "Audio",
                "items": [{ "equipmentId": "eq-mic", "quantity": 2, "notes": "pendant" }]
            },
            "createdBy": "u1"
        }))
        .await;

    let (status, body) = fixture
        .post(
            &format!("/api/templates/{}/apply", package_id),
            json!({ "roomId": room_id }),
        )
        .await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["data"]["type"], "equipment_package");
    assert_eq!(body["data"]["projectId"], "p-1");

    let (_, body) = fixture.get(&format!("/api/rooms/{}", room_id)).await;
    let placements = body["data"]["placedEquipment"].as_array().unwrap();
    assert_eq!(placements.len(), 4);
    assert_eq!(placements[2]["equipmentId"], "eq-mic");
    assert_eq!(placements[2]["x"], 1.0);
    assert_eq!(placements[3]["x"], 3.0);
    assert_eq!(placements[3]["notes"], "pendant");

    let quote_template_id = fixture
        .create_template(json!({
            "templateType": "quote",
            "name": "Standard Quote",
            "content": {
                "type": "quote",
                "sections": [
                    { "name": "Video", "category": "video", "defaultMarginPercent": 30.0 },
                    { "name": "Audio", "category": "audio", "defaultMarginPercent": 25.0 }
                ],
                "laborRates": [{ "category": "install", "ratePerHour": 95.0 }],
                "taxSettings": { "rate": 0.08, "appliesTo": ["equipment"] },
                "terms": "Net 30"
            },
            "createdBy": "u1"
        }))
        .await;

    let (status, body) = fixture
        .post(
            &format!("/api/templates/{}/apply", quote_template_id),
            json!({ "projectId": "p-1", "roomId": room_id }),
        )
        .await;
    assert_eq!(status, 200, "{}", body);
    let quote_id = body["data"]["quoteId"].as_str().unwrap().to_string();

    let (_, body) = fixture.get(&format!("/api/quotes/{}", quote_id)).await;
    let sections = body["data"]["sections"].as_array().unwrap();
    assert_eq!(sections.len(), 2);
    assert!(sections[0]["id"].as_str().unwrap().starts_with("section-"));
    assert_eq!(sections[1]["subtotal"], 0.0);
    assert_eq!(body["data"]["totals"]["total"], 0.0);
    assert_eq!(body["data"]["status"], "draft");
}

#[tokio::test]
async fn test_apply_package_to_missing_room() {
    let fixture = TestFixture::new().await;
    let package_id = fixture
        .create_template(json!({
            "templateType": "equipment_package",
            "name": "Kit",
            "content": { "type": "equipment_package", "category": "Video", "items": [] },
            "createdBy": "u1"
        }))
        .await;

    let (status, body) = fixture
        .post(
            &format!("/api/templates/{}/apply", package_id),
            json!({ "roomId": "no-such-room" }),
        )
        .await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_revision_increments_on_writes() {
    let fixture = TestFixture::new().await;

    let (_, body) = fixture.get("/api/revision").await;
    let initial = body["data"]["revisionId"].as_i64().unwrap();

    let (_, body) = fixture
        .post("/api/templates", room_template("Conference"))
        .await;
    let after_create = body["revisionId"].as_i64().unwrap();
    assert!(after_create > initial);

    let id = body["data"]["id"].as_str().unwrap().to_string();
    let (_, body) = fixture
        .post(&format!("/api/templates/{}/publish", id), json!({}))
        .await;
    assert!(body["revisionId"].as_i64().unwrap() > after_create);
    assert_eq!(body["data"]["isPublished"], true);
}
