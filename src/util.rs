/// Extract the `code` query parameter from a pasted redirect URL, as handed
/// back by the provider's authorize endpoint.
pub fn extract_auth_code(redirect_url: &str) -> Option<String> {
    let parsed = url::Url::parse(redirect_url).ok()?;
    parsed
        .query_pairs()
        .find(|(k, _)| k == "code")
        .map(|(_, v)| v.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_code_among_other_params() {
        let url = "http://127.0.0.1:8888/callback?state=xyz&code=AQB-abc123";
        assert_eq!(extract_auth_code(url).as_deref(), Some("AQB-abc123"));
    }

    #[test]
    fn missing_code_is_none() {
        assert!(extract_auth_code("http://127.0.0.1:8888/callback?error=access_denied").is_none());
        assert!(extract_auth_code("not a url").is_none());
    }
}
