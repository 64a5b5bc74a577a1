//! Some secrets are injected directly into the process environment rather
//! than a mounted config file. A CLI value prefixed `%` is read back out of
//! the named environment variable instead of being used literally, so a
//! Postgres/Redis/NATS URL containing credentials never needs to appear on
//! the command line or in an env-file committed anywhere.

const ENV_VAR_PREFIX: char = '%';

#[derive(Debug, thiserror::Error)]
#[error("environment variable `{0}` referenced by `%{0}` is not set")]
pub struct MissingEnvVar(pub String);

/// Resolves `raw` to its final string value: if it starts with `%`, reads
/// the rest as an environment variable name; otherwise returns it unchanged.
pub fn resolve(raw: &str) -> Result<String, MissingEnvVar> {
    match raw.strip_prefix(ENV_VAR_PREFIX) {
        Some(var_name) => std::env::var(var_name).map_err(|_| {
            tracing::error!(%var_name, "failed to load env var referenced by config");
            MissingEnvVar(var_name.to_owned())
        }),
        None => Ok(raw.to_owned()),
    }
}

/// `clap` value parser wrapping [`resolve`], for `#[clap(long, env, value_parser = ...)]`
/// fields that may carry a secret.
pub fn parse_env_indirected(raw: &str) -> Result<String, String> {
    resolve(raw).map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_through_plain_values() {
        assert_eq!(resolve("postgresql://localhost").unwrap(), "postgresql://localhost");
    }

    #[test]
    fn reads_from_env_var_when_prefixed() {
        std::env::set_var("SENDCORE_TEST_DB_URL", "postgresql://from-env");
        assert_eq!(
            resolve("%SENDCORE_TEST_DB_URL").unwrap(),
            "postgresql://from-env"
        );
        std::env::remove_var("SENDCORE_TEST_DB_URL");
    }

    #[test]
    fn errors_on_missing_env_var() {
        std::env::remove_var("SENDCORE_TEST_MISSING");
        assert!(resolve("%SENDCORE_TEST_MISSING").is_err());
    }
}
