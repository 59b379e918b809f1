use ag2api_types::RedirectConfig;
use std::time::Duration;

/// Build the HTTP client used for redirect resolution.
///
/// Redirects are never followed automatically; the resolver walks the chain
/// itself so it can stop at the first non-redirect hop.
pub fn build_http_client(config: &RedirectConfig) -> Result<reqwest::Client, String> {
    let mut builder = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(config.timeout_secs.max(1)))
        .tcp_nodelay(true);

    if let Some(url) = config.proxy_url.as_deref().filter(|u| !u.is_empty()) {
        let proxy =
            reqwest::Proxy::all(url).map_err(|e| format!("Invalid upstream proxy url: {}", e))?;
        builder = builder.proxy(proxy);
    }

    builder.build().map_err(|e| format!("Failed to build HTTP client: {}", e))
}
