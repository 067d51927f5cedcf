use serde_json::Value;
use std::time::Duration;

/// One positional CLI parameter. Order within the spec's `params` slice is
/// the order the argument is placed after the subcommand.
#[derive(Debug, Clone, Copy)]
pub struct Param {
    pub name: &'static str,
    /// `None` marks the parameter required: it must be present and non-empty.
    pub default: Option<&'static str>,
}

impl Param {
    const fn required(name: &'static str) -> Self {
        Self {
            name,
            default: None,
        }
    }

    const fn optional(name: &'static str, default: &'static str) -> Self {
        Self {
            name,
            default: Some(default),
        }
    }
}

/// Descriptor for one bridge endpoint: the CLI subcommand it maps to, its
/// positional parameters and the wait bound on the child process.
#[derive(Debug, Clone, Copy)]
pub struct EndpointSpec {
    pub route: &'static str,
    pub subcommand: &'static str,
    pub params: &'static [Param],
    pub timeout: Duration,
}

/// All bridge endpoints. The router dispatches `POST /api/cli/{route}`
/// through this table; there is no per-endpoint handler code.
pub const ENDPOINTS: &[EndpointSpec] = &[
    EndpointSpec {
        route: "generate",
        subcommand: "generate",
        params: &[],
        timeout: Duration::from_secs(10),
    },
    EndpointSpec {
        route: "load",
        subcommand: "load",
        params: &[Param::required("private_key")],
        timeout: Duration::from_secs(10),
    },
    EndpointSpec {
        route: "balance",
        subcommand: "balance",
        params: &[Param::required("address")],
        timeout: Duration::from_secs(10),
    },
    EndpointSpec {
        route: "utxos",
        subcommand: "utxos",
        params: &[Param::required("address")],
        timeout: Duration::from_secs(10),
    },
    EndpointSpec {
        route: "graffiti",
        subcommand: "graffiti",
        params: &[
            Param::required("private_key"),
            Param::required("message"),
            Param::optional("mimetype", "text/plain"),
            Param::optional("fee_rate", "1000"),
        ],
        timeout: Duration::from_secs(30),
    },
];

/// Builds the positional argument vector for a request body.
///
/// Returns the client-facing validation message on failure; no process is
/// spawned in that case. Required parameters must be present and non-empty.
/// Optional parameters default only when absent or null: an explicitly
/// provided value, empty string included, is forwarded as-is. Numbers are
/// stringified (the CLI takes every argument as text).
pub fn build_args(spec: &EndpointSpec, body: &Value) -> Result<Vec<String>, String> {
    let mut args = Vec::with_capacity(spec.params.len());

    for param in spec.params {
        let value = match body.get(param.name) {
            Some(Value::Null) | None => None,
            Some(value) => Some(
                stringify(value)
                    .ok_or_else(|| format!("{} must be a string or number", param.name))?,
            ),
        };

        match (value, param.default) {
            (Some(v), None) if v.is_empty() => return Err(format!("{} is required", param.name)),
            (Some(v), _) => args.push(v),
            (None, Some(default)) => args.push(default.to_string()),
            (None, None) => return Err(format!("{} is required", param.name)),
        }
    }

    Ok(args)
}

fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(route: &str) -> &'static EndpointSpec {
        ENDPOINTS.iter().find(|s| s.route == route).unwrap()
    }

    #[test]
    fn generate_takes_no_args() {
        let spec = spec("generate");
        assert_eq!(build_args(spec, &json!({})).unwrap(), Vec::<String>::new());
    }

    #[test]
    fn load_requires_private_key() {
        let spec = spec("load");
        let err = build_args(spec, &json!({})).unwrap_err();
        assert!(err.contains("private_key"));

        let err = build_args(spec, &json!({"private_key": ""})).unwrap_err();
        assert!(err.contains("private_key"));

        let args = build_args(spec, &json!({"private_key": "abc123"})).unwrap();
        assert_eq!(args, vec!["abc123"]);
    }

    #[test]
    fn balance_rejects_empty_address() {
        let spec = spec("balance");
        assert!(build_args(spec, &json!({"address": ""})).is_err());
        assert!(build_args(spec, &json!({})).is_err());

        let args = build_args(spec, &json!({"address": "kaspa:qq0"})).unwrap();
        assert_eq!(args, vec!["kaspa:qq0"]);
    }

    #[test]
    fn graffiti_positional_order_and_defaults() {
        let spec = spec("graffiti");
        let args = build_args(spec, &json!({"private_key": "k", "message": "hi"})).unwrap();
        assert_eq!(args, vec!["k", "hi", "text/plain", "1000"]);
    }

    #[test]
    fn graffiti_explicit_optionals_override_defaults() {
        let spec = spec("graffiti");
        let args = build_args(
            spec,
            &json!({
                "private_key": "k",
                "message": "hi",
                "mimetype": "image/png",
                "fee_rate": 500
            }),
        )
        .unwrap();
        assert_eq!(args, vec!["k", "hi", "image/png", "500"]);
    }

    #[test]
    fn fee_rate_accepts_numeric_string() {
        let spec = spec("graffiti");
        let args = build_args(
            spec,
            &json!({"private_key": "k", "message": "hi", "fee_rate": "2500"}),
        )
        .unwrap();
        assert_eq!(args[3], "2500");
    }

    #[test]
    fn non_scalar_param_is_a_validation_error() {
        let spec = spec("load");
        let err = build_args(spec, &json!({"private_key": {"nested": true}})).unwrap_err();
        assert!(err.contains("string or number"));
    }

    #[test]
    fn null_optional_falls_back_to_default() {
        let spec = spec("graffiti");
        let args = build_args(
            spec,
            &json!({"private_key": "k", "message": "hi", "mimetype": null}),
        )
        .unwrap();
        assert_eq!(args[2], "text/plain");
    }

    #[test]
    fn empty_optional_is_forwarded_verbatim() {
        let spec = spec("graffiti");
        let args = build_args(
            spec,
            &json!({"private_key": "k", "message": "hi", "mimetype": ""}),
        )
        .unwrap();
        assert_eq!(args, vec!["k", "hi", "", "1000"]);
    }
}
