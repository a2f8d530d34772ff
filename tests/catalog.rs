use pos_client::catalog::{CategoryRequest, StoreRequest};
use pos_client::{crud, ApiClient, ApiError};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn category_create_then_get_round_trips() {
    let server = MockServer::start().await;
    let req = CategoryRequest {
        name: "Bebidas".into(),
        description: Some("Frias y calientes".into()),
        image_key: Some("categories/bebidas.png".into()),
    };
    let stored = json!({
        "id": 5,
        "name": "Bebidas",
        "description": "Frias y calientes",
        "imageKey": "categories/bebidas.png",
        "imageUrl": "https://cdn.example.com/categories/bebidas.png"
    });

    Mock::given(method("POST"))
        .and(path("/api/categories"))
        .and(body_json(json!({
            "name": "Bebidas",
            "description": "Frias y calientes",
            "imageKey": "categories/bebidas.png"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(stored.clone()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/categories/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(stored))
        .expect(1)
        .mount(&server)
        .await;

    let repo = crud::categories(ApiClient::new(&server.uri()).unwrap());
    let created = repo.create(&req).await.unwrap();
    let fetched = repo.get(created.id).await.unwrap();

    assert_eq!(fetched.name, req.name);
    assert_eq!(fetched.description, req.description);
    assert_eq!(fetched.image_key, req.image_key);
}

#[tokio::test]
async fn invalid_payload_is_rejected_before_dispatch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/stores"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let repo = crud::stores(ApiClient::new(&server.uri()).unwrap());
    let err = repo
        .create(&StoreRequest { name: String::new(), address: None, phone: None, active: true })
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
}

#[tokio::test]
async fn list_update_and_delete_map_to_rest_verbs() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/stores"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "name": "Centro"},
            {"id": 2, "name": "Norte", "active": false}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/stores/2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 2, "name": "Norte 2"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/stores/2"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let repo = crud::stores(ApiClient::new(&server.uri()).unwrap());
    let stores = repo.list().await.unwrap();
    assert_eq!(stores.len(), 2);
    assert!(stores[0].active);
    assert!(!stores[1].active);

    let updated = repo
        .update(2, &StoreRequest { name: "Norte 2".into(), address: None, phone: None, active: true })
        .await
        .unwrap();
    assert_eq!(updated.name, "Norte 2");
    repo.delete(2).await.unwrap();
}

#[tokio::test]
async fn server_errors_are_returned_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/products/99"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Product not found"))
        .mount(&server)
        .await;

    let err = crud::products(ApiClient::new(&server.uri()).unwrap())
        .get(99)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.to_string(), "http 404: Product not found");
}
