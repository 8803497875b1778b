use biblio_e2e_tests::{prepare_env, spawn_server};
use tracing::info;
use tracing_test::traced_test;

#[tokio::test]
#[traced_test]
async fn test_health() {
    let (args, _config_guard) = prepare_env("test_health").await.unwrap();
    let base_url = args.base_url.clone();

    let server = spawn_server(args).await.unwrap();

    let client = reqwest::Client::new();

    let url = base_url.join("health").unwrap();
    let response = client.get(url).send().await.unwrap();
    info! {"Response: {:#?}", response};
    assert!(response.status().is_success());
    assert_eq!("OK", response.text().await.unwrap());

    server.stop().await.unwrap();
}

#[tokio::test]
#[traced_test]
async fn test_api_root() {
    let (args, _config_guard) = prepare_env("test_api_root").await.unwrap();
    let base_url = args.base_url.clone();
    let server = spawn_server(args).await.unwrap();
    let client = reqwest::Client::new();

    for path in ["api", "api/"] {
        let response = client.get(base_url.join(path).unwrap()).send().await.unwrap();
        assert!(response.status().is_success());
        let directory: serde_json::Value = response.json().await.unwrap();
        let list_url = base_url.join("api/books").unwrap();
        assert_eq!(list_url.as_str(), directory["endpoints"]["list"]["url"]);
    }

    server.stop().await.unwrap();
}

#[tokio::test]
#[traced_test]
async fn test_openapi_docs() {
    let (args, _config_guard) = prepare_env("test_openapi").await.unwrap();
    let base_url = args.base_url.clone();
    let server = spawn_server(args).await.unwrap();
    let client = reqwest::Client::new();

    let response = client
        .get(base_url.join("api-docs/openapi.json").unwrap())
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let docs: serde_json::Value = response.json().await.unwrap();
    assert!(docs["paths"]["/api/books/{id}"].is_object());

    server.stop().await.unwrap();
}
