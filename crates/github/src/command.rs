use std::sync::OnceLock;

use regex::Regex;

/// Extract the slash-command at the start of a comment body.
///
/// Returns the token following the leading `/`, up to the first whitespace.
pub fn parse_command(body: &str) -> Option<&str> {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = REGEX.get_or_init(|| Regex::new(r"^/(?P<command>\S+)").unwrap());
    regex.captures(body).and_then(|c| c.name("command")).map(|m| m.as_str())
}
