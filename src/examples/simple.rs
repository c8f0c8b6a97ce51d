//! Simple example of using reqwest-proxy-rotation.

use futures::StreamExt;
use reqwest::Method;
use reqwest_proxy_rotation::{ProxyRequester, RequestConfig, RequestOutcome, UserAgentRotation};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = RequestConfig::builder()
        .method(Method::HEAD)
        .timeout(Duration::from_secs(5))
        .retries(2)
        // concurrent requests, also the size of each connection pool
        .threads(4)
        .build();

    let requester = ProxyRequester::builder()
        .config(config)
        // one proxy per line: http://, https://, socks5:// or bare host:port
        .proxy_list([
            "http://127.0.0.1:8080",
            "https://127.0.0.1:8443",
            "socks5://127.0.0.1:1080",
        ])
        .headers(UserAgentRotation::new([
            "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0",
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_5) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Safari/605.1.15",
        ]))
        .debug(2)
        .build()?;

    let urls = ["/", "/admin/", "/backup.zip", "/.git/HEAD"]
        .iter()
        .map(|path| format!("http://httpbin.org{}", path))
        .collect::<Vec<_>>();

    let mut results = std::pin::pin!(requester.request_all(urls));
    while let Some((url, outcome)) = results.next().await {
        match outcome? {
            RequestOutcome::Completed(response) => println!("{} -> {}", url, response.status()),
            RequestOutcome::Recovered(failure) => println!("{} skipped: {}", url, failure),
        }
    }

    Ok(())
}
