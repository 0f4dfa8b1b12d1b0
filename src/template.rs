//! `{{name}}` substitution against an environment's variables
//!
//! A token is `{{` immediately followed by an identifier and `}}`. Tokens
//! without a binding are left intact so unresolved references stay visible.
//! Substitution is a single pass: a value that itself contains `{{x}}` is
//! inserted as-is and never resolved again.

use std::borrow::Cow;
use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

use crate::models::{AuthType, Header, RequestSpec};

static TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{([A-Za-z0-9_.\-]+)\}\}").expect("token pattern is valid")
});

/// Anything that can look up a variable by name
pub trait Variables {
    fn lookup(&self, name: &str) -> Option<&str>;
}

impl Variables for BTreeMap<String, String> {
    fn lookup(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl Variables for std::collections::HashMap<String, String> {
    fn lookup(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

/// Resolves tokens in a single string
pub fn resolve_str<V: Variables + ?Sized>(text: &str, vars: &V) -> String {
    resolve_cow(text, vars).into_owned()
}

fn resolve_cow<'t, V: Variables + ?Sized>(text: &'t str, vars: &V) -> Cow<'t, str> {
    if !text.contains("{{") {
        return Cow::Borrowed(text);
    }
    TOKEN.replace_all(text, |caps: &Captures| match vars.lookup(&caps[1]) {
        Some(value) => value.to_string(),
        None => caps[0].to_string(),
    })
}

/// Resolves every string leaf of a JSON value. Object keys are left alone.
pub fn resolve_value<V: Variables + ?Sized>(value: &Value, vars: &V) -> Value {
    match value {
        Value::String(s) => Value::String(resolve_str(s, vars)),
        Value::Array(items) => Value::Array(items.iter().map(|v| resolve_value(v, vars)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), resolve_value(v, vars)))
                .collect(),
        ),
        scalar => scalar.clone(),
    }
}

/// Resolves URL, headers, query parameters, auth and body independently
pub fn resolve_request<V: Variables + ?Sized>(request: &RequestSpec, vars: &V) -> RequestSpec {
    RequestSpec {
        method: request.method,
        url: resolve_str(&request.url, vars),
        headers: request
            .headers
            .iter()
            .map(|h| Header {
                key: resolve_str(&h.key, vars),
                value: resolve_str(&h.value, vars),
                enabled: h.enabled,
            })
            .collect(),
        query: request
            .query
            .iter()
            .map(|(k, v)| (resolve_str(k, vars), resolve_str(v, vars)))
            .collect(),
        body: request.body.as_ref().map(|b| resolve_value(b, vars)),
        auth: match &request.auth {
            AuthType::None => AuthType::None,
            AuthType::Bearer(token) => AuthType::Bearer(resolve_str(token, vars)),
            AuthType::Basic { username, password } => AuthType::Basic {
                username: resolve_str(username, vars),
                password: resolve_str(password, vars),
            },
        },
    }
}

/// Token names in `text` that have no binding, in order of first appearance
pub fn unresolved_tokens<V: Variables + ?Sized>(text: &str, vars: &V) -> Vec<String> {
    let mut missing: Vec<String> = Vec::new();
    for caps in TOKEN.captures_iter(text) {
        let name = &caps[1];
        if vars.lookup(name).is_none() && !missing.iter().any(|m| m == name) {
            missing.push(name.to_string());
        }
    }
    missing
}

/// Unbound token names anywhere in a request
pub fn unresolved_in_request<V: Variables + ?Sized>(request: &RequestSpec, vars: &V) -> Vec<String> {
    let mut texts = vec![request.url.clone()];
    for h in request.headers.iter().filter(|h| h.enabled) {
        texts.push(h.key.clone());
        texts.push(h.value.clone());
    }
    for (k, v) in &request.query {
        texts.push(k.clone());
        texts.push(v.clone());
    }
    match &request.auth {
        AuthType::Bearer(token) => texts.push(token.clone()),
        AuthType::Basic { username, password } => {
            texts.push(username.clone());
            texts.push(password.clone());
        }
        AuthType::None => {}
    }
    if let Some(body) = &request.body {
        collect_strings(body, &mut texts);
    }

    let mut missing: Vec<String> = Vec::new();
    for text in &texts {
        for name in unresolved_tokens(text, vars) {
            if !missing.contains(&name) {
                missing.push(name);
            }
        }
    }
    missing
}

fn collect_strings(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Array(items) => items.iter().for_each(|v| collect_strings(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_strings(v, out)),
        _ => {}
    }
}
