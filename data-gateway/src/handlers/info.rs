use axum::http::{header, HeaderMap, Uri};

const MISSING_HOSTNAME: &str = "missing";

/// Plain-text diagnostics: process hostname, the request's `Host` header and
/// the request URL. Does not touch the store.
pub async fn info(headers: HeaderMap, uri: Uri) -> String {
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .or_else(|| uri.authority().map(|a| a.to_string()))
        .unwrap_or_default();

    render(&hostname().await, &host, &uri)
}

fn render(hostname: &str, host: &str, uri: &Uri) -> String {
    format!(
        "\nhostname=  {}\nhost    =  {}\nurl     =  {}",
        hostname, host, uri
    )
}

async fn hostname() -> String {
    if let Ok(contents) = tokio::fs::read_to_string("/etc/hostname").await {
        let name = contents.trim();
        if !name.is_empty() {
            return name.to_string();
        }
    }

    std::env::var("HOSTNAME")
        .ok()
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| MISSING_HOSTNAME.to_string())
}
