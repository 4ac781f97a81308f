use hypermocker::{Bytes, Server, StatusCode};

#[tokio::test]
async fn anticipated_request_is_responded() {
    let _ = env_logger::try_init();

    let server = Server::bind().await;
    let url = format!("http://localhost:{}/config.hjson", server.port());
    let mut request = server.anticipate("/config.hjson").await;

    futures::future::join(
        async {
            let response = reqwest::get(url).await.unwrap();
            let bytes = response.bytes().await.unwrap();
            assert_eq!(&bytes[..], b"hello");
        },
        async {
            let parts = request.expect().await;
            assert_eq!(parts.uri.path(), "/config.hjson");
            request.respond(Bytes::from_static(b"hello")).await;
        },
    )
    .await;
}

#[tokio::test]
async fn response_can_be_prepared_before_request() {
    let _ = env_logger::try_init();

    let server = Server::bind().await;
    let url = format!("http://localhost:{}/missing", server.port());
    server
        .anticipate("/missing")
        .await
        .respond_with_status(StatusCode::NOT_FOUND)
        .await;

    let response = reqwest::get(url).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
#[should_panic(expected = "there are unexpected requests")]
async fn unexpected_request() {
    let _ = env_logger::try_init();

    let server = Server::bind().await;
    let url = format!("http://localhost:{}/foo", server.port());

    let response = reqwest::get(url).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::IM_A_TEAPOT);
    assert_eq!(&response.bytes().await.unwrap()[..], b"unexpected");
}
