//! Environment lookups used while building configuration defaults.

/// Get a standard environment variable, treating empty values as unset.
#[must_use]
pub fn get_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Get the current OS user.
#[must_use]
pub fn current_user() -> Option<String> {
    get_env("USER")
        .or_else(|| get_env("USERNAME"))
        .or_else(|| get_env("LOGNAME"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_variable_is_none() {
        assert!(get_env("TELNET_SESSION_SURELY_UNSET_VARIABLE").is_none());
    }

    #[test]
    fn current_user_matches_environment() {
        if let Ok(user) = std::env::var("USER")
            && !user.is_empty()
        {
            assert_eq!(current_user(), Some(user));
        }
    }
}
