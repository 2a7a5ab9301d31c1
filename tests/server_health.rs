mod support;

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let base_url = support::ensure_server();
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{base_url}/healthz"))
        .send()
        .await
        .expect("request should succeed");

    assert_eq!(res.status(), reqwest::StatusCode::OK);
    assert_eq!(res.text().await.expect("body"), "ok");
}
