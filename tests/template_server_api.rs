use cedar_template_server::api::common::percent_encode;
use cedar_template_server::{serve, AppConfig, MemoryStore};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;

// Test client wrapper for making API calls as a given user
struct TestClient {
    client: Client,
    base_url: String,
    user: Option<(&'static str, &'static str)>,
}

impl TestClient {
    /// Start a server with an empty in-memory store on an ephemeral port
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(serve(listener, Arc::new(MemoryStore::new()), AppConfig::default()));
        Self {
            client: Client::new(),
            base_url,
            user: Some(("test-user", "*")),
        }
    }

    fn as_user(&self, user: Option<(&'static str, &'static str)>) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            user,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .request(method, &format!("{}{}", self.base_url, path));
        match self.user {
            Some((id, permissions)) => builder
                .header("X-User-Id", id)
                .header("X-User-Permissions", permissions),
            None => builder,
        }
    }

    async fn post(&self, path: &str, json: Value) -> reqwest::Response {
        self.request(reqwest::Method::POST, path)
            .json(&json)
            .send()
            .await
            .unwrap()
    }

    async fn put(&self, path: &str, json: Value) -> reqwest::Response {
        self.request(reqwest::Method::PUT, path)
            .json(&json)
            .send()
            .await
            .unwrap()
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        self.request(reqwest::Method::GET, path).send().await.unwrap()
    }

    async fn delete(&self, path: &str) -> reqwest::Response {
        self.request(reqwest::Method::DELETE, path).send().await.unwrap()
    }
}

fn header<'a>(response: &'a reqwest::Response, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

async fn error_key(response: reqwest::Response) -> String {
    let body: Value = response.json().await.unwrap();
    body["errorKey"].as_str().unwrap_or_default().to_string()
}

/// Create the template instances are based on and return its id
async fn create_study_template(client: &TestClient) -> String {
    let response = client
        .post(
            "/templates",
            json!({
                "@type": "https://schema.metadatacenter.org/core/Template",
                "schema:name": "Study",
                "type": "object",
                "properties": {
                    "Title": {"type": "string"},
                    "Participants": {"type": "integer", "minimum": 0}
                },
                "required": ["Title"]
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    body["@id"].as_str().unwrap().to_string()
}

fn study_instance(template_id: &str, title: Option<&str>) -> Value {
    let mut instance = json!({
        "@context": {"schema": "http://schema.org/"},
        "schema:isBasedOn": template_id,
        "schema:name": "Study instance"
    });
    if let Some(title) = title {
        instance["Title"] = json!(title);
    }
    instance
}

fn instance_path(id: &str) -> String {
    format!("/template-instances/{}", percent_encode(id))
}

#[tokio::test]
async fn test_instance_create_find_update_delete() {
    let client = TestClient::start().await;
    let template_id = create_study_template(&client).await;

    // Create
    let response = client
        .post("/template-instances", study_instance(&template_id, Some("Trial")))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(header(&response, "x-cedar-validation-status"), Some("VALID"));
    let report: Value = serde_json::from_str(header(&response, "x-cedar-validation-report").unwrap()).unwrap();
    assert_eq!(report["status"], "VALID");
    let location = header(&response, "location").unwrap().to_string();
    let created: Value = response.json().await.unwrap();
    assert!(created.get("_id").is_none());
    let id = created["@id"].as_str().unwrap().to_string();
    assert!(location.ends_with(&percent_encode(&id)));
    assert!(created.get("pav:createdOn").is_some());

    // Find, default JSON-LD is the stored document unchanged
    let response = client.get(&instance_path(&id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let found: Value = response.json().await.unwrap();
    assert_eq!(found, created);

    // Plain JSON drops linked-data syntax
    let plain: Value = client
        .get(&format!("{}?format=json", instance_path(&id)))
        .await
        .json()
        .await
        .unwrap();
    assert!(plain.get("@context").is_none());
    assert_eq!(plain["isBasedOn"], template_id.as_str());
    assert_eq!(plain["id"], id.as_str());

    // N-Quads
    let response = client
        .get(&format!("{}?format=application%2Fn-quads", instance_path(&id)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "content-type"), Some("application/n-quads"));
    let quads = response.text().await.unwrap();
    assert!(quads.contains(&format!("<{}> <http://schema.org/isBasedOn>", id)));

    // Unknown format
    let response = client.get(&format!("{}?format=turtle", instance_path(&id))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_key(response).await, "UNKNOWN_OUTPUT_FORMAT");

    // Update: creation provenance survives, validation is re-run
    let response = client
        .put(&instance_path(&id), study_instance(&template_id, None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "x-cedar-validation-status"), Some("INVALID"));
    let updated: Value = response.json().await.unwrap();
    assert!(updated.get("_id").is_none());
    assert_eq!(updated["@id"], id.as_str());
    assert_eq!(updated["pav:createdOn"], created["pav:createdOn"]);

    // Delete, then deleting again is 404 twice
    let response = client.delete(&instance_path(&id)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    for _ in 0..2 {
        let response = client.delete(&instance_path(&id)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(error_key(response).await, "INSTANCE_NOT_FOUND");
    }
}

#[tokio::test]
async fn test_instance_validation_outcomes() {
    let client = TestClient::start().await;
    let template_id = create_study_template(&client).await;

    let response = client
        .post("/template-instances", study_instance(&template_id, None))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(header(&response, "x-cedar-validation-status"), Some("INVALID"));
    let report: Value = serde_json::from_str(header(&response, "x-cedar-validation-report").unwrap()).unwrap();
    assert_eq!(report["messages"][0]["constraint"], "required");

    // No schema reference: validation short-circuits with ERROR
    let response = client
        .post("/instances", json!({"schema:name": "orphan", "Title": "x"}))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(header(&response, "x-cedar-validation-status"), Some("ERROR"));
    let report: Value = serde_json::from_str(header(&response, "x-cedar-validation-report").unwrap()).unwrap();
    assert!(report["messages"][0]["message"]
        .as_str()
        .unwrap()
        .contains("schema:isBasedOn"));

    // Unknown template
    let response = client
        .post(
            "/template-instances",
            study_instance("https://repo.metadatacenter.org/templates/missing", Some("x")),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_key(response).await, "TEMPLATE_NOT_FOUND");
}

#[tokio::test]
async fn test_malformed_context_fails_nquads_conversion() {
    let client = TestClient::start().await;
    let template_id = create_study_template(&client).await;

    let mut instance = study_instance(&template_id, Some("Trial"));
    instance["@context"] = json!({"schema": 42});
    let created: Value = client.post("/template-instances", instance).await.json().await.unwrap();
    let id = created["@id"].as_str().unwrap();

    let response = client
        .get(&format!("{}?format=application/n-quads", instance_path(id)))
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["errorKey"], "RDF_CONVERSION_ERROR");
    assert_eq!(body["id"], id);
}

#[tokio::test]
async fn test_instance_listing() {
    let client = TestClient::start().await;
    let template_id = create_study_template(&client).await;
    for n in 0..5 {
        let title = format!("Trial {}", n);
        let response = client
            .post("/template-instances", study_instance(&template_id, Some(&title)))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = client.get("/template-instances?limit=2&offset=2").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "x-total-count"), Some("5"));
    let link = header(&response, "link").unwrap().to_string();
    assert!(link.contains("offset=0&limit=2>; rel=\"prev\""));
    assert!(link.contains("offset=4&limit=2>; rel=\"next\""));
    let page: Vec<Value> = response.json().await.unwrap();
    assert_eq!(page.len(), 2);
    assert!(page.iter().all(|item| item.get("_id").is_none()));

    // Everything on one page: no Link header
    let response = client.get("/template-instances").await;
    assert!(header(&response, "link").is_none());

    let summary: Vec<Value> = client
        .get("/template-instances?summary=true")
        .await
        .json()
        .await
        .unwrap();
    assert!(summary.iter().all(|item| item.get("Title").is_none() && item.get("@id").is_some()));

    let selected: Vec<Value> = client
        .get("/template-instances?fieldNames=Title")
        .await
        .json()
        .await
        .unwrap();
    assert!(selected
        .iter()
        .all(|item| item.as_object().unwrap().keys().collect::<Vec<_>>() == vec!["Title"]));

    let response = client.get("/template-instances?summary=true&fieldNames=Title").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_key(response).await, "FIELD_NAMES_CONFLICT");

    let response = client.get("/template-instances?limit=0").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_key(response).await, "PAGINATION_PARAMETER_INVALID");

    let response = client.get("/template-instances?offset=5").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_of_unknown_instance_is_not_found() {
    let client = TestClient::start().await;
    let template_id = create_study_template(&client).await;

    let response = client
        .put(
            &instance_path("https://repo.metadatacenter.org/template-instances/none"),
            study_instance(&template_id, Some("x")),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_key(response).await, "INSTANCE_NOT_FOUND");
}

#[tokio::test]
async fn test_permissions_are_enforced() {
    let client = TestClient::start().await;
    let template_id = create_study_template(&client).await;

    let anonymous = client.as_user(None);
    let response = anonymous
        .post("/template-instances", study_instance(&template_id, Some("x")))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_key(response).await, "ACCESS_DENIED");

    let reader = client.as_user(Some(("reader", "template-instance-read")));
    assert_eq!(reader.get("/template-instances").await.status(), StatusCode::OK);
    let response = reader
        .post("/template-instances", study_instance(&template_id, Some("x")))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Import mode needs its own capability
    let creator = client.as_user(Some(("creator", "template-instance-create")));
    let mut imported = study_instance(&template_id, Some("x"));
    imported["@id"] = json!("https://elsewhere.org/instances/1");
    let response = creator.post("/template-instances?importMode=true", imported.clone()).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = client.post("/template-instances?importMode=true", imported).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["@id"], "https://elsewhere.org/instances/1");
}

#[tokio::test]
async fn test_template_field_crud() {
    let client = TestClient::start().await;
    let field = json!({
        "@type": "https://schema.metadatacenter.org/core/TemplateField",
        "schema:name": "Title",
        "_valueConstraints": {"requiredValue": true}
    });

    let response = client.post("/template-fields", field.clone()).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(header(&response, "x-cedar-validation-status"), Some("VALID"));
    let created: Value = response.json().await.unwrap();
    let id = created["@id"].as_str().unwrap().to_string();
    let path = format!("/template-fields/{}", percent_encode(&id));

    let found: Value = client.get(&path).await.json().await.unwrap();
    assert_eq!(found, created);

    let mut renamed = field.clone();
    renamed["schema:name"] = json!("Study title");
    let response = client.put(&path, renamed).await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated: Value = response.json().await.unwrap();
    assert_eq!(updated["schema:name"], "Study title");
    assert_eq!(updated["pav:createdOn"], created["pav:createdOn"]);

    // PUT to an unknown local id creates it
    let fresh = "https://repo.metadatacenter.org/template-fields/fresh";
    let response = client
        .put(&format!("/template-fields/{}", percent_encode(fresh)), field.clone())
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let mut with_id = field.clone();
    with_id["@id"] = json!(fresh);
    let response = client.post("/template-fields", with_id).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_key(response).await, "ID_NOT_ALLOWED");

    let response = client.post("/template-fields", json!({"@type": "x"})).await;
    assert_eq!(error_key(response).await, "MISSING_NAME");

    let response = client.get("/template-fields/not-a-url").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_key(response).await, "INVALID_ID");

    let response = client.delete(&path).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = client.get(&path).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_key(response).await, "TEMPLATE_FIELD_NOT_FOUND");
}

#[tokio::test]
async fn test_template_field_put_creates_with_filled_provenance() {
    let client = TestClient::start().await;
    let id = "https://repo.metadatacenter.org/template-fields/imported-title";
    let path = format!("/template-fields/{}", percent_encode(id));
    let field = json!({
        "@type": "https://schema.metadatacenter.org/core/TemplateField",
        "schema:name": "Title",
        "pav:createdBy": "https://metadatacenter.org/users/original-author",
        "pav:createdOn": "2019-05-05T00:00:00+00:00"
    });

    let response = client.put(&path, field).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(header(&response, "x-cedar-validation-status"), Some("VALID"));
    assert!(header(&response, "location")
        .unwrap()
        .ends_with(&format!("/template-fields/{}", percent_encode(id))));
    let created: Value = response.json().await.unwrap();
    assert_eq!(created["@id"], id);
    assert_eq!(created["pav:createdBy"], "https://metadatacenter.org/users/original-author");
    assert_eq!(created["pav:createdOn"], "2019-05-05T00:00:00+00:00");
    assert_eq!(created["oslc:modifiedBy"], "https://metadatacenter.org/users/test-user");
    assert!(created["pav:lastUpdatedOn"].is_string());

    let found: Value = client.get(&path).await.json().await.unwrap();
    assert_eq!(found, created);
}

#[tokio::test]
async fn test_import_keeps_provenance_and_rejects_duplicate_ids() {
    let client = TestClient::start().await;
    let template_id = create_study_template(&client).await;

    let mut imported = study_instance(&template_id, Some("Trial"));
    imported["@id"] = json!("https://elsewhere.org/instances/7");
    imported["pav:createdBy"] = json!("https://metadatacenter.org/users/original-author");

    let response = client
        .post("/template-instances?importMode=true", imported.clone())
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Value = response.json().await.unwrap();
    assert_eq!(created["pav:createdBy"], "https://metadatacenter.org/users/original-author");
    assert_eq!(created["oslc:modifiedBy"], "https://metadatacenter.org/users/test-user");
    assert!(created["pav:createdOn"].is_string());
    assert!(created["pav:lastUpdatedOn"].is_string());

    let response = client
        .post("/template-instances?importMode=true", imported)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_key(response).await, "INVALID_ID");
}

#[tokio::test]
async fn test_request_body_errors() {
    let client = TestClient::start().await;
    let response = client
        .request(reqwest::Method::POST, "/template-instances")
        .header("content-type", "application/json")
        .body("")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_key(response).await, "MISSING_REQUEST_BODY");

    let response = client
        .request(reqwest::Method::POST, "/template-instances")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_key(response).await, "MALFORMED_REQUEST");

    let health: Value = client.get("/health").await.json().await.unwrap();
    assert_eq!(health["status"], "healthy");
}
