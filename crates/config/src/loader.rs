use std::{fmt::Write as _, path::Path};

use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;
use toml::Value;

use crate::{error::Error, Config};

pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, Error> {
    let content = std::fs::read_to_string(&path)?;
    let mut raw: Value = toml::from_str(&content)?;

    let mut path_stack = Vec::new();
    expand_env_vars(&mut path_stack, &mut raw).map_err(|reason| Error::EnvVarSubstitution {
        path: path.as_ref().display().to_string(),
        reason,
    })?;

    let config = Config::deserialize(raw).map_err(Error::ConfigParse)?;
    config.validate().map_err(Error::Validation)?;

    Ok(config)
}

fn env_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{\{\s*env\.([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").unwrap())
}

/// Expand `{{ env.VAR }}` placeholders against the process environment. Unlike a
/// full templating engine, a string may only ever be wholly or partially made of
/// such placeholders interleaved with literal text — there is no conditional logic.
fn expand_env_var_string(s: &str) -> Result<String, String> {
    let mut out = String::new();
    let mut last_end = 0;

    for capture in env_pattern().captures_iter(s) {
        let whole = capture.get(0).unwrap();
        let name = &capture[1];

        out.push_str(&s[last_end..whole.start()]);

        let value = std::env::var(name).map_err(|_| format!("environment variable '{name}' is not set"))?;
        out.push_str(&value);

        last_end = whole.end();
    }

    out.push_str(&s[last_end..]);

    Ok(out)
}

fn expand_env_vars<'a>(path: &mut Vec<Result<&'a str, usize>>, value: &'a mut Value) -> Result<(), String> {
    match value {
        Value::String(s) => {
            *s = expand_env_var_string(s).map_err(|err| {
                let mut rendered = String::new();

                for segment in path.iter() {
                    match segment {
                        Ok(key) => {
                            rendered.push_str(key);
                            rendered.push('.');
                        }
                        Err(index) => write!(rendered, "[{index}]").unwrap(),
                    }
                }

                if rendered.ends_with('.') {
                    rendered.pop();
                }

                format!("{rendered}: {err}")
            })?;
        }
        Value::Array(values) => {
            for (i, value) in values.iter_mut().enumerate() {
                path.push(Err(i));
                expand_env_vars(path, value)?;
                path.pop();
            }
        }
        Value::Table(map) => {
            for (key, value) in map.iter_mut() {
                path.push(Ok(key.as_str()));
                expand_env_vars(path, value)?;
                path.pop();
            }
        }
        Value::Integer(_) | Value::Float(_) | Value::Boolean(_) | Value::Datetime(_) => (),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_strings_pass_through_untouched() {
        assert_eq!(expand_env_var_string("plain value").unwrap(), "plain value");
    }

    #[test]
    fn single_placeholder_is_substituted() {
        // SAFETY: test-local env var, no concurrent access from other tests.
        unsafe { std::env::set_var("OPENCC_TEST_LOADER_VAR", "secret-value") };
        assert_eq!(
            expand_env_var_string("{{ env.OPENCC_TEST_LOADER_VAR }}").unwrap(),
            "secret-value"
        );
        unsafe { std::env::remove_var("OPENCC_TEST_LOADER_VAR") };
    }

    #[test]
    fn placeholder_embedded_in_literal_text_is_substituted_in_place() {
        // SAFETY: test-local env var, no concurrent access from other tests.
        unsafe { std::env::set_var("OPENCC_TEST_LOADER_HOST", "example.com") };
        assert_eq!(
            expand_env_var_string("https://{{ env.OPENCC_TEST_LOADER_HOST }}/v1").unwrap(),
            "https://example.com/v1"
        );
        unsafe { std::env::remove_var("OPENCC_TEST_LOADER_HOST") };
    }

    #[test]
    fn missing_env_var_is_an_error() {
        assert!(expand_env_var_string("{{ env.OPENCC_TEST_LOADER_MISSING_VAR }}").is_err());
    }
}
