use oats_domain::error::Error;

/// Map a reqwest transport error onto our error type. Timeouts keep
/// their own variant so retry classification can see them.
pub fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

/// Map a non-success HTTP status onto the transient/permanent split:
/// 429 and 5xx are transient (`Error::Http`), everything else is a
/// permanent provider rejection.
pub fn status_error(provider: &str, status: reqwest::StatusCode, body: &str) -> Error {
    let detail = body.chars().take(300).collect::<String>();
    if status.as_u16() == 429 || status.is_server_error() {
        Error::Http(format!("{provider}: HTTP {status}: {detail}"))
    } else {
        Error::Provider {
            provider: provider.to_owned(),
            message: format!("HTTP {status}: {detail}"),
        }
    }
}
