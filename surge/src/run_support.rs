use std::collections::BTreeMap;

use anyhow::Context as _;

pub(crate) type EnvVars = BTreeMap<String, String>;

/// Process env with `--env KEY=VALUE` overrides applied on top.
pub(crate) fn merged_env(overrides: &[String]) -> anyhow::Result<EnvVars> {
    let mut map: EnvVars = std::env::vars().collect();

    for raw in overrides {
        let (k, v) = parse_env_override(raw)?;
        map.insert(k, v);
    }

    Ok(map)
}

fn parse_env_override(s: &str) -> anyhow::Result<(String, String)> {
    let (k, v) = s
        .split_once('=')
        .with_context(|| format!("invalid --env (expected KEY=VALUE): {s}"))?;
    if k.is_empty() {
        anyhow::bail!("invalid --env (empty KEY): {s}");
    }
    Ok((k.to_string(), v.to_string()))
}

/// Replaces every `${NAME}` in `raw` with its value from `env`.
pub(crate) fn expand_vars(raw: &str, env: &EnvVars) -> anyhow::Result<String> {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .with_context(|| format!("unterminated `${{` in `{raw}`"))?;
        let name = &after[..end];
        if name.is_empty() {
            anyhow::bail!("empty variable name in `{raw}`");
        }
        let value = env
            .get(name)
            .with_context(|| format!("undefined variable `{name}` in `{raw}` (set it or pass --env {name}=...)"))?;
        out.push_str(value);
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> EnvVars {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn overrides_win_over_process_env() {
        let merged = merged_env(&["PATH=overridden".to_string(), "EMPTY=".to_string()])
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(merged.get("PATH").map(String::as_str), Some("overridden"));
        assert_eq!(merged.get("EMPTY").map(String::as_str), Some(""));
    }

    #[test]
    fn malformed_overrides_are_rejected() {
        assert!(merged_env(&["NOEQUALS".to_string()]).is_err());
        assert!(merged_env(&["=value".to_string()]).is_err());
    }

    #[test]
    fn expands_placeholders() {
        let vars = env(&[("BASE_URL", "http://127.0.0.1:8080"), ("P", "health")]);
        let out = expand_vars("${BASE_URL}/${P}?x=1", &vars).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(out, "http://127.0.0.1:8080/health?x=1");

        let plain = expand_vars("http://example.com/", &vars).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(plain, "http://example.com/");
    }

    #[test]
    fn expansion_errors_name_the_problem() {
        let vars = env(&[]);
        let err = expand_vars("${MISSING}/", &vars)
            .err()
            .unwrap_or_else(|| panic!("expected error"));
        assert!(err.to_string().contains("MISSING"));

        assert!(expand_vars("${OPEN", &vars).is_err());
        assert!(expand_vars("${}", &vars).is_err());
    }
}
