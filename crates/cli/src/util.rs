use typed_path::Utf8NativePathBuf;

/// Parse a path option for argp.
pub fn native_path(value: &str) -> Result<Utf8NativePathBuf, String> {
    if value.is_empty() {
        return Err("path must not be empty".to_string());
    }
    Ok(Utf8NativePathBuf::from(value))
}

/// Path to the event payload, falling back to the runner's `GITHUB_EVENT_PATH`.
pub fn event_path(explicit: Option<&Utf8NativePathBuf>) -> Option<Utf8NativePathBuf> {
    explicit.cloned().or_else(|| {
        std::env::var("GITHUB_EVENT_PATH")
            .ok()
            .filter(|v| !v.is_empty())
            .map(Utf8NativePathBuf::from)
    })
}
