//! cURL command rendering and parsing
//!
//! Rendering gives a copy-paste equivalent of a resolved request. Parsing is
//! used for `send --from-curl` and for the sample headers of documented
//! `curl_command` entries.

use serde_json::Value;

use crate::error::ValidationError;
use crate::models::{AuthType, Header, HttpMethod, RequestSpec};

/// Flags that take no value and change nothing we model
const NO_OP_FLAGS: &[&str] = &[
    "--compressed",
    "-k",
    "--insecure",
    "-L",
    "--location",
    "-s",
    "--silent",
    "-S",
    "--show-error",
    "-v",
    "--verbose",
    "-i",
    "--include",
];

/// Parses a cURL command line. Unknown flags are skipped; the first bare
/// word is the URL.
pub fn parse_curl(input: &str) -> Result<RequestSpec, ValidationError> {
    let joined = input.replace("\\\r\n", " ").replace("\\\n", " ");
    let words = split_words(&joined);
    let mut words = words.iter().map(String::as_str).peekable();
    if words.peek() == Some(&"curl") {
        words.next();
    }

    let mut request = RequestSpec::new(HttpMethod::GET, "");
    let mut method_given = false;

    while let Some(word) = words.next() {
        if NO_OP_FLAGS.contains(&word) {
            continue;
        }
        match word {
            "-X" | "--request" => {
                if let Some(method) = words.next() {
                    request.method = method.parse()?;
                    method_given = true;
                }
            }
            "-H" | "--header" => {
                if let Some(line) = words.next() {
                    add_header(&mut request, Header::parse(line)?);
                }
            }
            "-d" | "--data" | "--data-raw" | "--data-binary" | "--json" => {
                if let Some(data) = words.next() {
                    request.body = Some(Value::String(data.to_string()));
                    if !method_given {
                        request.method = HttpMethod::POST;
                    }
                    if word == "--json" && !request.has_header("content-type") {
                        request.headers.push(Header::new("Content-Type", "application/json"));
                    }
                }
            }
            "-u" | "--user" => {
                if let Some(credentials) = words.next() {
                    let (username, password) = credentials.split_once(':').unwrap_or((credentials, ""));
                    request.auth = AuthType::Basic {
                        username: username.to_string(),
                        password: password.to_string(),
                    };
                }
            }
            "--url" => {
                if let Some(url) = words.next() {
                    request.url = url.to_string();
                }
            }
            bare if !bare.starts_with('-') && request.url.is_empty() => {
                request.url = bare.to_string();
            }
            _ => {}
        }
    }

    Ok(request)
}

/// Bearer authorization becomes [`AuthType::Bearer`]; repeated names keep
/// the first value
fn add_header(request: &mut RequestSpec, header: Header) {
    if header.key.eq_ignore_ascii_case("authorization") {
        if let Some(token) = header
            .value
            .get(..7)
            .filter(|scheme| scheme.eq_ignore_ascii_case("bearer "))
            .map(|_| header.value[7..].trim())
        {
            request.auth = AuthType::Bearer(token.to_string());
            return;
        }
    }
    if !request.has_header(&header.key) {
        request.headers.push(header);
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Quote {
    None,
    Single,
    Double,
}

/// Shell-style word splitting: single and double quotes, backslash escapes
/// outside single quotes
fn split_words(input: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut quote = Quote::None;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Quote::Single, '\'') | (Quote::Double, '"') => quote = Quote::None,
            (Quote::None, '\'') => quote = Quote::Single,
            (Quote::None, '"') => quote = Quote::Double,
            (Quote::None | Quote::Double, '\\') => {
                if let Some(escaped) = chars.next() {
                    word.push(escaped);
                }
            }
            (Quote::None, c) if c.is_whitespace() => {
                if !word.is_empty() {
                    words.push(std::mem::take(&mut word));
                }
            }
            (_, c) => word.push(c),
        }
    }
    if !word.is_empty() {
        words.push(word);
    }
    words
}

/// Single-quote for a POSIX shell
fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

/// Renders a request as a multi-line cURL command
pub fn to_curl(request: &RequestSpec) -> String {
    let body = request.body_text();
    let mut lines = vec!["curl".to_string()];

    // -d alone would turn a GET into a POST
    if request.method != HttpMethod::GET || !body.is_empty() {
        lines.push(format!("-X {}", request.method));
    }
    lines.push(quote(&request.full_url()));

    let header_line = |name: &str, value: &str| format!("-H {}", quote(&format!("{}: {}", name, value)));
    lines.extend(
        request
            .headers
            .iter()
            .filter(|h| h.enabled)
            .map(|h| header_line(&h.key, &h.value)),
    );
    if matches!(request.body, Some(Value::Object(_) | Value::Array(_))) && !request.has_header("content-type") {
        lines.push(header_line("Content-Type", "application/json"));
    }

    match &request.auth {
        AuthType::None => {}
        AuthType::Bearer(token) => lines.push(header_line("Authorization", &format!("Bearer {}", token))),
        AuthType::Basic { username, password } => {
            lines.push(format!("-u {}", quote(&format!("{}:{}", username, password))))
        }
    }

    if !body.is_empty() {
        lines.push(format!("-d {}", quote(&body)));
    }

    lines.join(" \\\n  ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bare_url_is_a_get() {
        let req = parse_curl("curl -s https://api.example.com/orders").unwrap();
        assert_eq!(req.url, "https://api.example.com/orders");
        assert_eq!(req.method, HttpMethod::GET);
        assert!(req.body.is_none());
    }

    #[test]
    fn test_data_implies_post_unless_method_given() {
        let req = parse_curl(r#"curl -H "Content-Type: application/json" -d '{"sku":"A1"}' https://api.example.com/orders"#)
            .unwrap();
        assert_eq!(req.method, HttpMethod::POST);
        assert_eq!(req.body_text(), r#"{"sku":"A1"}"#);
        assert_eq!(req.headers, vec![Header::new("Content-Type", "application/json")]);

        let req = parse_curl("curl -X PATCH --data 'x=1' https://api.example.com/orders/7").unwrap();
        assert_eq!(req.method, HttpMethod::PATCH);
    }

    #[test]
    fn test_templated_url_and_bearer_token() {
        let curl = "curl -X DELETE \"{{base_url}}/users/{{id}}\" \\\n  -H \"authorization: bearer {{token}}\"";
        let req = parse_curl(curl).unwrap();
        assert_eq!(req.method, HttpMethod::DELETE);
        assert_eq!(req.url, "{{base_url}}/users/{{id}}");
        assert_eq!(req.auth, AuthType::Bearer("{{token}}".into()));
        assert!(req.headers.is_empty());
    }

    #[test]
    fn test_basic_credentials_and_json_flag() {
        let req = parse_curl("curl -u admin:s3cret --json '[1]' --url http://localhost/batch").unwrap();
        assert_eq!(
            req.auth,
            AuthType::Basic {
                username: "admin".into(),
                password: "s3cret".into()
            }
        );
        assert_eq!(req.url, "http://localhost/batch");
        assert!(req.has_header("content-type"));
    }

    #[test]
    fn test_unknown_method_is_rejected() {
        assert!(parse_curl("curl -X BREW http://pot").is_err());
    }

    #[test]
    fn test_escaped_quotes_stay_in_the_word() {
        assert_eq!(
            split_words(r#"-d "say \"hi\"" 'a b'"#),
            vec!["-d", r#"say "hi""#, "a b"]
        );
    }

    #[test]
    fn test_renders_query_headers_and_json_body() {
        let mut req = RequestSpec::new(HttpMethod::POST, "http://localhost:8000/items");
        req.headers.push(Header::new("X-Trace", "abc"));
        req.query.push(("dry".into(), "1".into()));
        req.body = Some(json!({"name": "it's"}));

        assert_eq!(
            to_curl(&req),
            "curl \\\n  -X POST \\\n  'http://localhost:8000/items?dry=1' \\\n  -H 'X-Trace: abc' \\\n  -H 'Content-Type: application/json' \\\n  -d '{\"name\":\"it'\\''s\"}'"
        );
    }

    #[test]
    fn test_plain_get_has_no_method_flag() {
        let req = RequestSpec::new(HttpMethod::GET, "http://localhost/x");
        assert_eq!(to_curl(&req), "curl \\\n  'http://localhost/x'");
    }

    #[test]
    fn test_rendered_command_parses_back() {
        let mut req = RequestSpec::new(HttpMethod::PUT, "http://localhost/a");
        req.headers.push(Header::new("Accept", "text/plain"));
        req.body = Some(Value::String("hello world".into()));
        req.auth = AuthType::Bearer("t".into());

        let parsed = parse_curl(&to_curl(&req)).unwrap();
        assert_eq!(parsed.method, HttpMethod::PUT);
        assert_eq!(parsed.url, "http://localhost/a");
        assert_eq!(parsed.body_text(), "hello world");
        assert_eq!(parsed.headers, req.headers);
        assert_eq!(parsed.auth, req.auth);
    }
}
