//! Block-scoped field extraction over docker compose text.
//!
//! The compose file is never parsed as YAML. It is split once into a flat
//! list of indented tokens and every question (which services exist, what a
//! block's ports or environment are) is answered by walking that list. Only
//! the conventional block-style subset of compose files is understood;
//! anything else degrades to missing fields, never to an error.

use regex::Regex;
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    /// `key:` or `key: value`. The value is unquoted and has trailing
    /// comments removed; `None` means the key opens a nested block.
    Key { key: String, value: Option<String> },
    /// A `- entry` sequence item, comments removed, quotes kept.
    Item(String),
    /// Any other line, e.g. the continuation of a multi-line scalar.
    Text(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    /// 1-based line number in the source text.
    pub line: usize,
    /// Number of leading spaces.
    pub indent: usize,
    pub kind: TokenKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortMapping {
    pub host: String,
    pub container: String,
}

impl PortMapping {
    /// Container port without a `/tcp` or `/udp` suffix.
    pub fn container_port(&self) -> &str {
        self.container.split('/').next().unwrap_or(self.container.as_str())
    }
}

impl std::fmt::Display for PortMapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.container)
    }
}

pub fn tokenize(text: &str) -> Vec<Token> {
    let key_re = Regex::new(r"^([^\s:#'\x22][^:]*?)\s*:(?:\s+(.*))?$").expect("valid regex");

    text.lines()
        .enumerate()
        .filter_map(|(index, raw)| {
            let content = raw.trim();
            if content.is_empty() || content.starts_with('#') {
                return None;
            }

            let indent = raw.len() - raw.trim_start_matches(' ').len();
            let kind = classify(content, &key_re);

            Some(Token {
                line: index + 1,
                indent,
                kind,
            })
        })
        .collect()
}

fn classify(content: &str, key_re: &Regex) -> TokenKind {
    if content == "-" {
        return TokenKind::Item(String::new());
    }
    if let Some(item) = content.strip_prefix("- ") {
        return TokenKind::Item(strip_comment(item).to_string());
    }

    if let Some((key, rest)) = split_quoted_key(content) {
        return TokenKind::Key {
            key,
            value: clean_value(rest),
        };
    }

    match key_re.captures(content) {
        Some(caps) => TokenKind::Key {
            key: caps[1].to_string(),
            value: caps.get(2).and_then(|m| clean_value(m.as_str())),
        },
        None => TokenKind::Text(content.to_string()),
    }
}

/// `"some key": value` or `'some key':`
fn split_quoted_key(content: &str) -> Option<(String, &str)> {
    let quote = content.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let close = content[1..].find(quote)? + 1;
    let after = content[close + 1..].strip_prefix(':')?;

    if !after.is_empty() && !after.starts_with(char::is_whitespace) {
        return None;
    }

    Some((content[1..close].to_string(), after))
}

fn clean_value(raw: &str) -> Option<String> {
    let value = strip_comment(raw);
    if value.is_empty() {
        return None;
    }
    Some(unquote(value).to_string())
}

/// Drops a ` # comment` tail that sits outside of quotes.
fn strip_comment(raw: &str) -> &str {
    let mut quote: Option<char> = None;
    let mut prev_is_space = true;

    for (index, c) in raw.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '#' && prev_is_space => return raw[..index].trim(),
            None => {}
        }
        prev_is_space = c.is_whitespace();
    }

    raw.trim()
}

/// Removes one pair of matching surrounding quotes.
pub fn unquote(value: &str) -> &str {
    let value = value.trim();
    let bytes = value.as_bytes();

    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return &value[1..value.len() - 1];
        }
    }

    value
}

/// End (exclusive) of the block opened by `tokens[head]`.
///
/// Deeper tokens belong to the block. Sequence items at the key's own
/// indentation belong to it too (`ports:` directly followed by `- "80:80"`
/// in the same column), as long as the key has no inline value.
fn block_end(tokens: &[Token], head: usize) -> usize {
    let head_token = &tokens[head];
    let compact = matches!(&head_token.kind, TokenKind::Key { value: None, .. });

    tokens[head + 1..]
        .iter()
        .position(|t| {
            let nested = t.indent > head_token.indent;
            let compact_item =
                compact && t.indent == head_token.indent && matches!(t.kind, TokenKind::Item(_));
            !(nested || compact_item)
        })
        .map(|offset| head + 1 + offset)
        .unwrap_or(tokens.len())
}

fn key_matches(token: &Token, indent: usize, key: &str) -> bool {
    token.indent == indent && matches!(&token.kind, TokenKind::Key { key: k, .. } if k == key)
}

/// A key line together with everything nested under it.
#[derive(Clone, Copy, Debug)]
pub struct Block<'a> {
    tokens: &'a [Token],
}

impl<'a> Block<'a> {
    fn open(tokens: &'a [Token], head: usize) -> Self {
        let end = block_end(tokens, head);
        Block {
            tokens: &tokens[head..end],
        }
    }

    fn head(&self) -> &'a Token {
        &self.tokens[0]
    }

    fn body(&self) -> &'a [Token] {
        &self.tokens[1..]
    }

    pub fn key(&self) -> &'a str {
        match &self.head().kind {
            TokenKind::Key { key, .. } => key,
            _ => "",
        }
    }

    /// Inline value of the block's own key, e.g. `image: postgres:14`.
    pub fn inline_value(&self) -> Option<&'a str> {
        match &self.head().kind {
            TokenKind::Key { value, .. } => value.as_deref(),
            _ => None,
        }
    }

    fn child_indent(&self) -> Option<usize> {
        self.body().first().map(|t| t.indent)
    }

    /// Direct `key:` children, in order.
    pub fn children(&self) -> impl Iterator<Item = Block<'a>> + 'a {
        let tokens = self.tokens;
        let child_indent = self.child_indent();

        (1..tokens.len()).filter_map(move |i| {
            let is_key = matches!(tokens[i].kind, TokenKind::Key { .. });
            (is_key && Some(tokens[i].indent) == child_indent).then(|| Block::open(tokens, i))
        })
    }

    pub fn child(&self, key: &str) -> Option<Block<'a>> {
        self.children().find(|child| child.key() == key)
    }

    /// Inline value of a direct child key.
    pub fn value(&self, key: &str) -> Option<&'a str> {
        self.child(key).and_then(|child| child.inline_value())
    }

    /// Direct sequence items, in order.
    pub fn items(&self) -> impl Iterator<Item = &'a str> + 'a {
        let child_indent = self.child_indent();

        self.body().iter().filter_map(move |t| match &t.kind {
            TokenKind::Item(item) if Some(t.indent) == child_indent => Some(item.as_str()),
            _ => None,
        })
    }

    /// Short-syntax entries of the nested `ports:` list.
    pub fn ports(&self) -> Vec<PortMapping> {
        let Some(ports) = self.child("ports") else {
            return Vec::new();
        };

        ports.items().filter_map(parse_port_mapping).collect()
    }

    /// The nested `environment:` section, in mapping or list form.
    pub fn environment(&self) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        let Some(environment) = self.child("environment") else {
            return env;
        };

        for entry in environment.children() {
            let value = entry.inline_value().unwrap_or_default();
            env.insert(entry.key().to_string(), value.to_string());
        }

        for item in environment.items() {
            let item = unquote(item);
            let (key, value) = item.split_once('=').unwrap_or((item, ""));
            let key = key.trim();
            if key.is_empty() || key.contains(char::is_whitespace) {
                continue;
            }
            env.insert(key.to_string(), unquote(value).to_string());
        }

        env
    }
}

/// Splits on `:` outside of `${...}` and `[...]`.
fn split_port_parts(entry: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let bytes = entry.as_bytes();

    for (index, &b) in bytes.iter().enumerate() {
        match b {
            b'{' | b'[' => depth += 1,
            b'}' | b']' => depth = depth.saturating_sub(1),
            b':' if depth == 0 => {
                parts.push(&entry[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    parts.push(&entry[start..]);

    parts
}

fn parse_port_mapping(item: &str) -> Option<PortMapping> {
    let entry = unquote(item);

    // long syntax (`- target: 80`) is a mapping, not a short-form port
    if entry.contains(": ") || entry.ends_with(':') {
        return None;
    }

    let parts = split_port_parts(entry);
    let (host, container) = match parts.as_slice() {
        [host, container] => (host, container),
        [_bind_address, host, container] => (host, container),
        _ => return None,
    };

    let (host, container) = (unquote(host), unquote(container));
    if host.is_empty() || container.is_empty() {
        return None;
    }

    Some(PortMapping {
        host: host.to_string(),
        container: container.to_string(),
    })
}

/// A service declared under the top-level `services:` key.
#[derive(Clone, Copy, Debug)]
pub struct ServiceEntry<'a> {
    pub name: &'a str,
    pub image: Option<&'a str>,
    pub block: Block<'a>,
}

#[derive(Clone, Debug, Default)]
pub struct ComposeDocument {
    tokens: Vec<Token>,
}

impl ComposeDocument {
    pub fn parse(text: &str) -> Self {
        ComposeDocument {
            tokens: tokenize(text),
        }
    }

    /// The first block whose key sits at exactly `indent` spaces.
    pub fn block(&self, indent: usize, key: &str) -> Option<Block<'_>> {
        self.tokens
            .iter()
            .position(|t| key_matches(t, indent, key))
            .map(|head| Block::open(&self.tokens, head))
    }

    /// The block opened by a line such as `"  db:"`. A service of that name
    /// wins over a same-named key elsewhere, e.g. under `volumes:`.
    pub fn block_by_prefix(&self, prefix: &str) -> Option<Block<'_>> {
        let indent = prefix.len() - prefix.trim_start_matches(' ').len();
        let key = unquote(prefix.trim().trim_end_matches(':').trim_end());

        self.services()
            .into_iter()
            .find(|service| service.name == key && service.block.head().indent == indent)
            .map(|service| service.block)
            .or_else(|| self.block(indent, key))
    }

    /// Declared services in document order.
    pub fn services(&self) -> Vec<ServiceEntry<'_>> {
        let Some(services) = self.block(0, "services") else {
            return Vec::new();
        };

        services
            .children()
            .filter(|block| block.inline_value().is_none())
            .map(|block| ServiceEntry {
                name: block.key(),
                image: block.value("image"),
                block,
            })
            .collect()
    }

    pub fn service(&self, name: &str) -> Option<ServiceEntry<'_>> {
        self.services().into_iter().find(|s| s.name == name)
    }

    /// First service whose image contains `hint`, case-insensitively. With
    /// `match_name` the service name may match instead.
    pub fn service_matching(&self, hint: &str, match_name: bool) -> Option<ServiceEntry<'_>> {
        let hint = hint.to_lowercase();
        self.services().into_iter().find(|s| {
            let image_matches = s
                .image
                .map(|image| image.to_lowercase().contains(&hint))
                .unwrap_or(false);
            image_matches || (match_name && s.name.to_lowercase().contains(&hint))
        })
    }
}

/// Port mappings of the block opened by `block_prefix` (e.g. `"  db:"`).
pub fn extract_ports(text: &str, block_prefix: &str) -> Vec<PortMapping> {
    ComposeDocument::parse(text)
        .block_by_prefix(block_prefix)
        .map(|block| block.ports())
        .unwrap_or_default()
}

/// Environment of the block opened by `block_prefix` (e.g. `"  db:"`).
pub fn extract_environment(text: &str, block_prefix: &str) -> BTreeMap<String, String> {
    ComposeDocument::parse(text)
        .block_by_prefix(block_prefix)
        .map(|block| block.environment())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_DATABASES: &str = r#"
version: '3.8'
services:
  db:
    image: postgres:14
    ports:
      - "5432:5432"
    environment:
      POSTGRES_USER: admin
      POSTGRES_PASSWORD: "secret"
  cache:
    image: redis:7-alpine
    ports:
      - 6380:6379
    environment:
      - REDIS_PASSWORD=hunter2
      - EMPTY=
volumes:
  db:
    driver: local
"#;

    fn mapping(host: &str, container: &str) -> PortMapping {
        PortMapping {
            host: host.to_string(),
            container: container.to_string(),
        }
    }

    #[test]
    fn test_tokenize_keys_items_and_comments() {
        let tokens = tokenize("services:\n  # comment\n\n  db:\n    image: postgres:14 # pinned\n    ports:\n      - \"5432:5432\"\n");

        assert_eq!(tokens.len(), 5);
        assert_eq!(
            tokens[0].kind,
            TokenKind::Key {
                key: "services".to_string(),
                value: None
            }
        );
        assert_eq!(tokens[1].indent, 2);
        assert_eq!(tokens[1].line, 4);
        assert_eq!(
            tokens[2].kind,
            TokenKind::Key {
                key: "image".to_string(),
                value: Some("postgres:14".to_string())
            }
        );
        assert_eq!(tokens[4].kind, TokenKind::Item("\"5432:5432\"".to_string()));
        assert_eq!(tokens[4].indent, 6);
    }

    #[test]
    fn test_tokenize_quoted_keys_and_scalars() {
        let tokens = tokenize("\"xpack.security.enabled\": 'false'\nimage:postgres\n");

        assert_eq!(
            tokens[0].kind,
            TokenKind::Key {
                key: "xpack.security.enabled".to_string(),
                value: Some("false".to_string())
            }
        );
        assert_eq!(tokens[1].kind, TokenKind::Text("image:postgres".to_string()));
    }

    #[test]
    fn test_hash_inside_quotes_is_not_a_comment() {
        let doc = ComposeDocument::parse("services:\n  db:\n    environment:\n      PASSWORD: \"p#ss word\"\n");
        let env = doc.service("db").unwrap().block.environment();
        assert_eq!(env["PASSWORD"], "p#ss word");
    }

    #[test]
    fn test_services_in_document_order_with_images() {
        let doc = ComposeDocument::parse(TWO_DATABASES);
        let services = doc.services();

        let names: Vec<_> = services.iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["db", "cache"]);
        assert_eq!(services[0].image, Some("postgres:14"));
        assert_eq!(services[1].image, Some("redis:7-alpine"));
    }

    #[test]
    fn test_ports_are_scoped_to_their_block() {
        let doc = ComposeDocument::parse(TWO_DATABASES);

        assert_eq!(doc.service("db").unwrap().block.ports(), vec![mapping("5432", "5432")]);
        assert_eq!(doc.service("cache").unwrap().block.ports(), vec![mapping("6380", "6379")]);
    }

    #[test]
    fn test_environment_is_scoped_to_its_block() {
        let doc = ComposeDocument::parse(TWO_DATABASES);

        let db = doc.service("db").unwrap().block.environment();
        assert_eq!(db.len(), 2);
        assert_eq!(db["POSTGRES_USER"], "admin");
        assert_eq!(db["POSTGRES_PASSWORD"], "secret");

        let cache = doc.service("cache").unwrap().block.environment();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache["REDIS_PASSWORD"], "hunter2");
        assert_eq!(cache["EMPTY"], "");
    }

    #[test]
    fn test_empty_mapping_values() {
        let doc = ComposeDocument::parse(
            "services:\n  app:\n    environment:\n      X:\n      Y: \"\"\n      Z: v\n",
        );
        let env = doc.service("app").unwrap().block.environment();

        assert_eq!(env.len(), 3);
        assert_eq!(env["X"], "");
        assert_eq!(env["Y"], "");
        assert_eq!(env["Z"], "v");
    }

    #[test]
    fn test_list_environment_strips_quotes_and_keeps_bare_keys() {
        let doc = ComposeDocument::parse(
            "services:\n  app:\n    environment:\n      - \"A=1\"\n      - B='two words'\n      - C\n      - D=x=y\n      - A=3\n",
        );
        let env = doc.service("app").unwrap().block.environment();

        assert_eq!(env["A"], "3");
        assert_eq!(env["B"], "two words");
        assert_eq!(env["C"], "");
        assert_eq!(env["D"], "x=y");
    }

    #[test]
    fn test_compact_sequences_in_the_key_column() {
        let doc = ComposeDocument::parse(
            "services:\n  web:\n    ports:\n    - \"8080:80\"\n    - 8443:443\n    environment:\n    - MODE=dev\n    image: nginx\n",
        );
        let web = doc.service("web").unwrap();

        assert_eq!(web.block.ports(), vec![mapping("8080", "80"), mapping("8443", "443")]);
        assert_eq!(web.block.environment()["MODE"], "dev");
        assert_eq!(web.image, Some("nginx"));
    }

    #[test]
    fn test_port_variants() {
        let doc = ComposeDocument::parse(
            "services:\n  svc:\n    ports:\n      - \"127.0.0.1:9200:9200\"\n      - \"9300:9300/tcp\"\n      - \"${WEB_PORT:-8080}:80\"\n      - \"7000\"\n      - target: 80\n        published: 8081\n",
        );
        let ports = doc.service("svc").unwrap().block.ports();

        assert_eq!(
            ports,
            vec![
                mapping("9200", "9200"),
                mapping("9300", "9300/tcp"),
                mapping("${WEB_PORT:-8080}", "80"),
            ]
        );
        assert_eq!(ports[1].container_port(), "9300");
        assert_eq!(ports[1].to_string(), "9300:9300/tcp");
    }

    #[test]
    fn test_block_ends_at_shallower_line() {
        let doc = ComposeDocument::parse(
            "services:\n  a:\n    image: one\n  b:\n    image: two\n    ports:\n      - \"1:1\"\nnetworks:\n  ports:\n    - \"2:2\"\n",
        );

        let a = doc.service("a").unwrap();
        assert!(a.block.ports().is_empty());
        assert!(a.block.environment().is_empty());
        assert_eq!(doc.service("b").unwrap().block.ports(), vec![mapping("1", "1")]);
    }

    #[test]
    fn test_nested_lookalike_sections_are_ignored() {
        let doc = ComposeDocument::parse(
            "services:\n  app:\n    image: app\n    deploy:\n      environment:\n        HIDDEN: yes\n    environment:\n      VISIBLE: yes\n",
        );
        let env = doc.service("app").unwrap().block.environment();

        assert_eq!(env.len(), 1);
        assert_eq!(env["VISIBLE"], "yes");
    }

    #[test]
    fn test_service_matching_is_case_insensitive_first_match() {
        let doc = ComposeDocument::parse(
            "services:\n  primary:\n    image: Postgres:15\n  replica:\n    image: postgres:15\n  builder:\n    build: .\n",
        );

        assert_eq!(doc.service_matching("postgres", false).unwrap().name, "primary");
        assert!(doc.service_matching("mysql", false).is_none());
        assert!(doc.service_matching("build", false).is_none());
        assert_eq!(doc.service_matching("build", true).unwrap().name, "builder");
        assert_eq!(doc.services().len(), 3);
        assert_eq!(doc.service("builder").unwrap().image, None);
    }

    #[test]
    fn test_extract_by_prefix() {
        assert_eq!(extract_ports(TWO_DATABASES, "  cache:"), vec![mapping("6380", "6379")]);

        let env = extract_environment(TWO_DATABASES, "  db:");
        assert_eq!(env["POSTGRES_USER"], "admin");

        assert!(extract_ports(TWO_DATABASES, "  missing:").is_empty());
        assert!(extract_environment("", "  db:").is_empty());
    }

    #[test]
    fn test_prefix_prefers_the_service_block() {
        let compose = "volumes:\n  db:\n    driver: local\nservices:\n  db:\n    image: postgres:14\n    ports:\n      - \"5432:5432\"\n    environment:\n      POSTGRES_USER: admin\n";

        assert_eq!(extract_ports(compose, "  db:"), vec![mapping("5432", "5432")]);
        assert_eq!(extract_environment(compose, "  db:")["POSTGRES_USER"], "admin");

        let doc = ComposeDocument::parse(compose);
        let db = doc.block_by_prefix("  db:").unwrap();
        assert_eq!(db.value("image"), Some("postgres:14"));
        assert!(extract_ports("volumes:\n  data:\n    driver: local\n", "  data:").is_empty());
    }

    #[test]
    fn test_nonconforming_input_degrades_to_empty() {
        let doc = ComposeDocument::parse("\t- ]]]\n::::\n  - \nservices: {}\n");
        assert!(doc.services().is_empty());
        assert!(extract_ports("{ services: { db: { ports: [1:1] } } }", "  db:").is_empty());
    }

    #[test]
    fn test_windows_line_endings() {
        let doc = ComposeDocument::parse("services:\r\n  db:\r\n    image: mysql:8\r\n    ports:\r\n      - \"3307:3306\"\r\n");
        let db = doc.service("db").unwrap();

        assert_eq!(db.image, Some("mysql:8"));
        assert_eq!(db.block.ports(), vec![mapping("3307", "3306")]);
    }

    #[test]
    fn test_agrees_with_a_yaml_parser_on_block_style_files() {
        let yaml: serde_yaml::Value = serde_yaml::from_str(TWO_DATABASES).unwrap();
        let doc = ComposeDocument::parse(TWO_DATABASES);

        let parsed_ports: Vec<String> = yaml["services"]["db"]["ports"]
            .as_sequence()
            .unwrap()
            .iter()
            .map(|p| p.as_str().unwrap().to_string())
            .collect();
        let extracted: Vec<String> = doc
            .service("db")
            .unwrap()
            .block
            .ports()
            .iter()
            .map(|p| p.to_string())
            .collect();
        assert_eq!(parsed_ports, extracted);

        let parsed_env = yaml["services"]["db"]["environment"].as_mapping().unwrap();
        let extracted_env = doc.service("db").unwrap().block.environment();
        assert_eq!(parsed_env.len(), extracted_env.len());
        for (key, value) in parsed_env {
            assert_eq!(extracted_env[key.as_str().unwrap()], value.as_str().unwrap());
        }
    }
}
