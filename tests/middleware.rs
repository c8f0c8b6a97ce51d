use reqwest_middleware::ClientBuilder;
use reqwest_proxy_rotation::{
    MemorySink, ProxyEvent, ProxyRequester, ProxyRotationMiddleware, RecoveredFailure,
    RequestConfig, UserAgentRotation,
};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_middleware_routes_through_proxy() {
    let proxy = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/login"))
        .and(header("x-scan", "1"))
        .and(header_exists("user-agent"))
        .respond_with(ResponseTemplate::new(200).set_body_string("login"))
        .expect(1)
        .mount(&proxy)
        .await;

    let requester = ProxyRequester::builder()
        .proxy_list([proxy.uri()])
        .headers(UserAgentRotation::new(["agent-a", "agent-b"]))
        .build()
        .unwrap();

    let client = ClientBuilder::new(reqwest::Client::new())
        .with(ProxyRotationMiddleware::new(requester))
        .build();

    let response = client
        .get("http://scan-target.test/login")
        .header("x-scan", "1")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "login");
}

#[tokio::test]
async fn test_middleware_surfaces_recovered_failure() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let dead = format!("http://127.0.0.1:{}", listener.local_addr().unwrap().port());
    drop(listener);

    let sink = Arc::new(MemorySink::new());
    let requester = Arc::new(
        ProxyRequester::builder()
            .proxy_list([dead.clone()])
            .config(
                RequestConfig::builder()
                    .retries(0)
                    .timeout(Duration::from_secs(2))
                    .build(),
            )
            .events(Arc::clone(&sink))
            .build()
            .unwrap(),
    );

    let client = ClientBuilder::new(reqwest::Client::new())
        .with(ProxyRotationMiddleware::from_shared(Arc::clone(&requester)))
        .build();

    let err = client
        .get("http://scan-target.test/config.php")
        .send()
        .await
        .unwrap_err();

    match err {
        reqwest_middleware::Error::Middleware(e) => {
            let failure = e.downcast_ref::<RecoveredFailure>().expect("recovered failure");
            assert_eq!(failure.path, "/config.php");
            assert_eq!(failure.proxy.as_str(), dead);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(matches!(
        sink.events().as_slice(),
        [ProxyEvent::MaxRetryError { .. }]
    ));
}
