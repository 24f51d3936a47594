mod common;

use std::net::SocketAddr;

use common::TestApp;

async fn spawn_server(app: &TestApp) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app.router.clone();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn uploaded_image_is_served_back() {
    let app = TestApp::new();
    let addr = spawn_server(&app).await;
    let client = reqwest::Client::new();

    let image = b"\xff\xd8\xff\xe0jpeg-ish bytes".to_vec();
    let form = reqwest::multipart::Form::new()
        .text("title", "Sunset")
        .text("content", "Taken from the pier")
        .part(
            "image",
            reqwest::multipart::Part::bytes(image.clone())
                .file_name("sunset.jpg")
                .mime_str("image/jpeg")
                .unwrap(),
        );

    let response = client
        .post(format!("http://{}/feed/post", addr))
        .header("Origin", "http://localhost:3000")
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::CREATED);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "*"
    );

    let body: serde_json::Value = response.json().await.unwrap();
    let image_url = body["post"]["imageUrl"].as_str().unwrap();
    assert!(image_url.ends_with("-sunset.jpg"));

    let served = client
        .get(format!("http://{}/{}", addr, image_url))
        .send()
        .await
        .unwrap();
    assert_eq!(served.status(), reqwest::StatusCode::OK);
    assert_eq!(served.bytes().await.unwrap().to_vec(), image);
}

#[tokio::test]
async fn listed_posts_match_created_ones() {
    let app = TestApp::new();
    let addr = spawn_server(&app).await;
    let client = reqwest::Client::new();

    let created: serde_json::Value = client
        .post(format!("http://{}/feed/post", addr))
        .json(&serde_json::json!({ "title": "Over the wire", "content": "Hello there" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let listed: serde_json::Value = client
        .get(format!("http://{}/feed/posts", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(listed["posts"].as_array().unwrap().len(), 1);
    assert_eq!(listed["posts"][0], created["post"]);
}
