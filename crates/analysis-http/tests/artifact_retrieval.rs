use analysis_http::{AnalysisClient, AnalysisHttpConfig, AnalysisHttpError};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> AnalysisClient {
    AnalysisClient::new(AnalysisHttpConfig {
        artifact_base_url: server.uri(),
        ..AnalysisHttpConfig::default()
    })
    .expect("client should build")
}

#[tokio::test]
async fn fetch_artifact_returns_body_and_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/get-video"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![1_u8, 2, 3, 4], "video/mp4"))
        .expect(1)
        .mount(&server)
        .await;

    let payload = client_for(&server)
        .fetch_artifact("/get-video")
        .await
        .expect("fetch should succeed");

    assert_eq!(payload.content_type, "video/mp4");
    assert_eq!(payload.bytes.as_ref(), &[1, 2, 3, 4]);
}

#[tokio::test]
async fn fetch_artifact_treats_non_success_status_as_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/get-mask"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let error = client_for(&server)
        .fetch_artifact("/get-mask")
        .await
        .expect_err("404 must fail");

    let AnalysisHttpError::UnexpectedStatus { url, status } = error else {
        panic!("expected UnexpectedStatus, got {error:?}");
    };
    assert_eq!(status, 404);
    assert!(url.ends_with("/get-mask"));
}

#[tokio::test]
async fn one_failing_route_does_not_affect_another() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/get-mask"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/get-ecg"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![9_u8; 16], "image/png"))
        .mount(&server)
        .await;
    let client = client_for(&server);

    let (mask, ecg) = tokio::join!(
        client.fetch_artifact("/get-mask"),
        client.fetch_artifact("/get-ecg")
    );

    assert!(mask.is_err());
    let ecg = ecg.expect("ecg should succeed");
    assert_eq!(ecg.content_type, "image/png");
    assert_eq!(ecg.bytes.len(), 16);
}
