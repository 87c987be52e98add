use anyhow::{Context, Result};
use std::fmt::Display;
use std::str::FromStr;

pub fn get_env_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn parse_env_var<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    get_env_var(key)
        .map(|value| {
            value
                .parse::<T>()
                .map_err(|e| anyhow::anyhow!("{}", e))
                .context(format!("{} has an invalid value: {}", key, value))
        })
        .transpose()
}

pub fn current_user() -> Option<String> {
    get_env_var("USER").or_else(|| get_env_var("USERNAME"))
}
