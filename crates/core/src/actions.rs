//! Helpers for running inside a GitHub Actions job.

/// Read an action input, resolving variables through `lookup`.
///
/// Inputs are exposed by the runner as `INPUT_<NAME>`, upper-cased with spaces
/// replaced by underscores. Empty values are treated as unset.
pub fn get_input_from<F>(name: &str, lookup: F) -> Option<String>
where F: Fn(&str) -> Option<String> {
    let key = format!("INPUT_{}", name.replace(' ', "_").to_uppercase());
    lookup(&key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Escape a message for use in a workflow command.
pub fn escape_data(value: &str) -> String {
    value.replace('%', "%25").replace('\r', "%0D").replace('\n', "%0A")
}

/// Emit an error annotation for the current step.
///
/// The caller is responsible for exiting with a failure status.
pub fn set_failed(message: &str) {
    println!("::error::{}", escape_data(message));
}
