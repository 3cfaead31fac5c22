//! Connection summaries for well-known infrastructure services.
//!
//! The service directory name selects a [`ServiceKind`]; each kind has one
//! entry in [`PRESENTERS`] that knows which image to look for, which
//! container ports matter and how to spell its connection strings. Any other
//! directory falls back to [`render_generic`].

use crate::docker_compose::docker_compose::{ComposeDocument, PortMapping, ServiceEntry};
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt::{self, Write};
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString};

const HOST: &str = "localhost";
const SECTION_WIDTH: usize = 40;

pub const NO_AUTH: &str = "Authentication: none configured";
pub const NOT_SET: &str = "(not set)";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumString, Display, EnumIter)]
pub enum ServiceKind {
    #[strum(to_string = "mysql")]
    MySql,
    #[strum(to_string = "postgres")]
    Postgres,
    #[strum(to_string = "mongo")]
    Mongo,
    #[strum(to_string = "redis")]
    Redis,
    #[strum(to_string = "elasticsearch-kibana")]
    ElasticsearchKibana,
    #[strum(to_string = "neo4j")]
    Neo4j,
}

impl ServiceKind {
    /// Exact match on the service directory name.
    pub fn from_service_name(name: &str) -> Option<Self> {
        ServiceKind::from_str(name).ok()
    }

    pub fn presenter(self) -> Option<&'static Presenter> {
        PRESENTERS.iter().find(|p| p.kind == self)
    }
}

type Render = fn(&ComposeDocument, &Endpoint<'_>, &mut String) -> fmt::Result;
type RenderMissing = fn(&ComposeDocument, &mut String) -> fmt::Result;

pub struct Presenter {
    pub kind: ServiceKind,
    pub label: &'static str,
    /// Case-insensitive substring of the image that identifies the service.
    pub image_hint: &'static str,
    /// Also accept services whose name contains the hint.
    pub match_name: bool,
    render: Render,
    /// Output that still applies after the not-found line.
    render_missing: Option<RenderMissing>,
}

pub static PRESENTERS: [Presenter; 6] = [
    Presenter {
        kind: ServiceKind::MySql,
        label: "MySQL",
        image_hint: "mysql",
        match_name: false,
        render: render_mysql,
        render_missing: None,
    },
    Presenter {
        kind: ServiceKind::Postgres,
        label: "PostgreSQL",
        image_hint: "postgres",
        match_name: false,
        render: render_postgres,
        render_missing: None,
    },
    Presenter {
        kind: ServiceKind::Mongo,
        label: "MongoDB",
        image_hint: "mongo",
        match_name: false,
        render: render_mongo,
        render_missing: None,
    },
    Presenter {
        kind: ServiceKind::Redis,
        label: "Redis",
        image_hint: "redis",
        match_name: false,
        render: render_redis,
        render_missing: None,
    },
    Presenter {
        kind: ServiceKind::ElasticsearchKibana,
        label: "Elasticsearch",
        image_hint: "elasticsearch",
        match_name: true,
        render: render_elasticsearch_kibana,
        render_missing: Some(render_kibana_only),
    },
    Presenter {
        kind: ServiceKind::Neo4j,
        label: "Neo4j",
        image_hint: "neo4j",
        match_name: false,
        render: render_neo4j,
        render_missing: None,
    },
];

impl Presenter {
    pub fn locate<'d>(&self, doc: &'d ComposeDocument) -> Option<ServiceEntry<'d>> {
        doc.service_matching(self.image_hint, self.match_name)
    }

    pub fn present(&self, doc: &ComposeDocument) -> Result<String, fmt::Error> {
        let mut out = String::new();

        match self.locate(doc) {
            Some(service) => {
                let endpoint = Endpoint::new(service);
                (self.render)(doc, &endpoint, &mut out)?;
            }
            None => {
                writeln!(out, "{} service not found in docker-compose.yml", self.label)?;
                if let Some(render_missing) = self.render_missing {
                    render_missing(doc, &mut out)?;
                }
            }
        }

        Ok(out)
    }
}

/// Connection info for `service_name`, using its kind-specific presenter when
/// there is one and the generic listing otherwise.
pub fn render_info(service_name: &str, doc: &ComposeDocument) -> Result<String, fmt::Error> {
    match ServiceKind::from_service_name(service_name).and_then(ServiceKind::presenter) {
        Some(presenter) => presenter.present(doc),
        None => {
            let mut out = String::new();
            render_generic(service_name, doc, &mut out)?;
            Ok(out)
        }
    }
}

/// A located service with its ports and environment pulled out once.
pub struct Endpoint<'a> {
    pub service: ServiceEntry<'a>,
    pub ports: Vec<PortMapping>,
    pub env: BTreeMap<String, String>,
}

impl<'a> Endpoint<'a> {
    pub fn new(service: ServiceEntry<'a>) -> Self {
        Endpoint {
            ports: service.block.ports(),
            env: service.block.environment(),
            service,
        }
    }

    /// Host port published for `container_port`, or the container port itself.
    pub fn published(&self, container_port: u16) -> String {
        let wanted = container_port.to_string();
        self.ports
            .iter()
            .find(|mapping| mapping.container_port() == wanted)
            .map(|mapping| mapping.host.clone())
            .unwrap_or(wanted)
    }

    /// Non-empty environment value.
    pub fn var(&self, key: &str) -> Option<&str> {
        self.env
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    fn flag(&self, key: &str) -> bool {
        self.var(key)
            .map(|value| matches!(value.to_lowercase().as_str(), "true" | "yes" | "1"))
            .unwrap_or(false)
    }

    /// The `command:` of the service flattened to one line.
    fn command_line(&self) -> Option<String> {
        let command = self.service.block.child("command")?;
        match command.inline_value() {
            Some(inline) => Some(inline.to_string()),
            None => Some(command.items().collect::<Vec<_>>().join(" ")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Auth {
    Password(String),
    NotSet,
    Disabled,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub user: Option<String>,
    pub auth: Auth,
}

impl Credentials {
    fn password(user: impl Into<String>, password: Option<&str>) -> Self {
        Credentials {
            user: Some(user.into()),
            auth: password.map_or(Auth::NotSet, |p| Auth::Password(p.to_string())),
        }
    }

    fn disabled(user: Option<&str>) -> Self {
        Credentials {
            user: user.map(str::to_string),
            auth: Auth::Disabled,
        }
    }

    fn write_lines(&self, out: &mut String) -> fmt::Result {
        if let Some(user) = &self.user {
            writeln!(out, "User: {user}")?;
        }
        match &self.auth {
            Auth::Password(password) => writeln!(out, "Password: {password}"),
            Auth::NotSet => writeln!(out, "Password: {NOT_SET}"),
            Auth::Disabled => writeln!(out, "{NO_AUTH}"),
        }
    }

    /// `user:password@`, `user@` or nothing, for URIs.
    fn userinfo(&self) -> String {
        match (&self.user, &self.auth) {
            (Some(user), Auth::Password(password)) => format!("{user}:{password}@"),
            (Some(user), _) => format!("{user}@"),
            (None, Auth::Password(password)) => format!(":{password}@"),
            (None, _) => String::new(),
        }
    }

    fn secret(&self) -> Option<&str> {
        match &self.auth {
            Auth::Password(password) => Some(password),
            _ => None,
        }
    }
}

fn section(out: &mut String, title: &str) -> fmt::Result {
    writeln!(out, "{title}")?;
    writeln!(out, "{}", "-".repeat(SECTION_WIDTH))
}

fn path_suffix(database: Option<&str>) -> String {
    database.map(|db| format!("/{db}")).unwrap_or_default()
}

fn render_mysql(_doc: &ComposeDocument, ep: &Endpoint<'_>, out: &mut String) -> fmt::Result {
    let port = ep.published(3306);
    let database = ep.var("MYSQL_DATABASE");
    let root_password = ep.var("MYSQL_ROOT_PASSWORD");

    let credentials = match ep.var("MYSQL_USER") {
        Some(user) => Credentials::password(user, ep.var("MYSQL_PASSWORD")),
        None if root_password.is_some() => Credentials::password("root", root_password),
        None if ep.flag("MYSQL_ALLOW_EMPTY_PASSWORD") || ep.flag("MYSQL_RANDOM_ROOT_PASSWORD") => {
            Credentials::disabled(Some("root"))
        }
        None => Credentials::password("root", None),
    };

    section(out, "MySQL Connection Information:")?;
    writeln!(out, "Host: {HOST}")?;
    writeln!(out, "Port: {port}")?;
    writeln!(out, "Database: {}", database.unwrap_or(NOT_SET))?;
    credentials.write_lines(out)?;
    if credentials.user.as_deref() != Some("root") {
        if let Some(root_password) = root_password {
            writeln!(out, "Root Password: {root_password}")?;
        }
    }

    let user = credentials.user.as_deref().unwrap_or("root");
    let password_flag = credentials.secret().map(|p| format!(" -p{p}")).unwrap_or_default();
    let db = path_suffix(database);

    writeln!(out, "\nConnection Strings:")?;
    writeln!(out, "JDBC: jdbc:mysql://{HOST}:{port}{db}")?;
    writeln!(out, "URL: mysql://{}{HOST}:{port}{db}", credentials.userinfo())?;
    writeln!(
        out,
        "CLI: mysql -h {HOST} -P {port} -u {user}{password_flag}{}",
        database.map(|db| format!(" {db}")).unwrap_or_default()
    )
}

fn render_postgres(_doc: &ComposeDocument, ep: &Endpoint<'_>, out: &mut String) -> fmt::Result {
    let port = ep.published(5432);
    let user = ep.var("POSTGRES_USER").unwrap_or("postgres");
    // the image creates a database named after the user unless told otherwise
    let database = ep.var("POSTGRES_DB").unwrap_or(user);

    let trust = ep
        .var("POSTGRES_HOST_AUTH_METHOD")
        .map(|method| method.eq_ignore_ascii_case("trust"))
        .unwrap_or(false);
    let credentials = if trust {
        Credentials::disabled(Some(user))
    } else {
        Credentials::password(user, ep.var("POSTGRES_PASSWORD"))
    };

    section(out, "PostgreSQL Connection Information:")?;
    writeln!(out, "Host: {HOST}")?;
    writeln!(out, "Port: {port}")?;
    writeln!(out, "Database: {database}")?;
    credentials.write_lines(out)?;

    writeln!(out, "\nConnection Strings:")?;
    writeln!(out, "JDBC: jdbc:postgresql://{HOST}:{port}/{database}")?;
    writeln!(
        out,
        "URL: postgresql://{}{HOST}:{port}/{database}",
        credentials.userinfo()
    )?;
    writeln!(out, "CLI: psql -h {HOST} -p {port} -U {user} -d {database}")
}

fn render_mongo(_doc: &ComposeDocument, ep: &Endpoint<'_>, out: &mut String) -> fmt::Result {
    let port = ep.published(27017);
    let credentials = match ep.var("MONGO_INITDB_ROOT_USERNAME") {
        Some(user) => Credentials::password(user, ep.var("MONGO_INITDB_ROOT_PASSWORD")),
        None => Credentials::disabled(None),
    };

    section(out, "MongoDB Connection Information:")?;
    writeln!(out, "Host: {HOST}")?;
    writeln!(out, "Port: {port}")?;
    if let Some(database) = ep.var("MONGO_INITDB_DATABASE") {
        writeln!(out, "Database: {database}")?;
    }
    credentials.write_lines(out)?;

    let uri = match credentials.auth {
        Auth::Disabled => format!("mongodb://{HOST}:{port}"),
        _ => {
            writeln!(out, "Authentication Database: admin")?;
            format!("mongodb://{}{HOST}:{port}/admin", credentials.userinfo())
        }
    };

    writeln!(out, "\nConnection Strings:")?;
    writeln!(out, "URI: {uri}")?;
    writeln!(out, "CLI: mongosh {uri}")
}

fn redis_password(ep: &Endpoint<'_>) -> Option<String> {
    if let Some(password) = ep.var("REDIS_PASSWORD") {
        return Some(password.to_string());
    }

    let command = ep.command_line()?.replace(['[', ']', ',', '"', '\''], " ");
    let requirepass = Regex::new(r"--requirepass\s+(\S+)").expect("valid regex");
    requirepass
        .captures(&command)
        .map(|caps| caps[1].to_string())
}

fn render_redis(_doc: &ComposeDocument, ep: &Endpoint<'_>, out: &mut String) -> fmt::Result {
    let port = ep.published(6379);
    let credentials = Credentials {
        user: None,
        auth: redis_password(ep).map_or(Auth::Disabled, Auth::Password),
    };

    section(out, "Redis Connection Information:")?;
    writeln!(out, "Host: {HOST}")?;
    writeln!(out, "Port: {port}")?;
    credentials.write_lines(out)?;

    let password_flag = credentials.secret().map(|p| format!(" -a {p}")).unwrap_or_default();

    writeln!(out, "\nConnection Strings:")?;
    writeln!(out, "URI: redis://{}{HOST}:{port}", credentials.userinfo())?;
    writeln!(out, "CLI: redis-cli -h {HOST} -p {port}{password_flag}")
}

fn render_elasticsearch_kibana(
    doc: &ComposeDocument,
    ep: &Endpoint<'_>,
    out: &mut String,
) -> fmt::Result {
    let port = ep.published(9200);
    let security_enabled = ep.flag("xpack.security.enabled");
    let credentials = if security_enabled {
        Credentials::password("elastic", ep.var("ELASTIC_PASSWORD"))
    } else {
        Credentials::disabled(None)
    };

    section(out, "Elasticsearch Connection Information:")?;
    writeln!(out, "Elasticsearch URL: http://{HOST}:{port}")?;
    if security_enabled {
        writeln!(out, "Security: Enabled (requires authentication)")?;
    }
    credentials.write_lines(out)?;

    write_kibana_and_examples(doc, &port, &credentials, out)
}

/// Kibana and the curl examples against the default Elasticsearch port.
fn render_kibana_only(doc: &ComposeDocument, out: &mut String) -> fmt::Result {
    write_kibana_and_examples(doc, "9200", &Credentials::disabled(None), out)
}

fn write_kibana_and_examples(
    doc: &ComposeDocument,
    port: &str,
    credentials: &Credentials,
    out: &mut String,
) -> fmt::Result {
    if let Some(kibana) = doc.service_matching("kibana", true) {
        let kibana = Endpoint::new(kibana);
        writeln!(out)?;
        section(out, "Kibana Information:")?;
        writeln!(out, "Kibana URL: http://{HOST}:{}", kibana.published(5601))?;
    }

    let curl_auth = match (&credentials.user, credentials.secret()) {
        (Some(user), Some(password)) => format!(" -u {user}:{password}"),
        (Some(user), None) => format!(" -u {user}"),
        _ => String::new(),
    };

    writeln!(out, "\nExample Commands:")?;
    writeln!(
        out,
        "Check Elasticsearch health: curl{curl_auth} http://{HOST}:{port}/_cluster/health?pretty"
    )?;
    writeln!(out, "View indices: curl{curl_auth} http://{HOST}:{port}/_cat/indices")
}

fn render_neo4j(_doc: &ComposeDocument, ep: &Endpoint<'_>, out: &mut String) -> fmt::Result {
    let http_port = ep.published(7474);
    let bolt_port = ep.published(7687);

    let credentials = match ep.var("NEO4J_AUTH") {
        Some(auth) if auth.eq_ignore_ascii_case("none") => Credentials::disabled(None),
        Some(auth) => match auth.split_once('/') {
            Some((user, password)) => Credentials::password(user, Some(password)),
            None => Credentials::password(auth, None),
        },
        None => Credentials::password("neo4j", None),
    };

    section(out, "Neo4j Connection Information:")?;
    writeln!(out, "Host: {HOST}")?;
    writeln!(out, "HTTP Port: {http_port}")?;
    writeln!(out, "Bolt Port: {bolt_port}")?;
    credentials.write_lines(out)?;

    let cli_auth = match (&credentials.user, credentials.secret()) {
        (Some(user), Some(password)) => format!(" -u {user} -p {password}"),
        (Some(user), None) => format!(" -u {user}"),
        _ => String::new(),
    };

    writeln!(out, "\nConnection Strings:")?;
    writeln!(out, "Browser: http://{HOST}:{http_port}")?;
    writeln!(out, "Bolt: bolt://{HOST}:{bolt_port}")?;
    writeln!(out, "CLI: cypher-shell -a bolt://{HOST}:{bolt_port}{cli_auth}")
}

/// Every declared service with its image, ports and environment.
pub fn render_generic(service_name: &str, doc: &ComposeDocument, out: &mut String) -> fmt::Result {
    section(out, "Service Configuration:")?;

    for service in doc.services() {
        let endpoint = Endpoint::new(service);

        writeln!(out, "Service: {}", service.name)?;
        writeln!(out, "Image: {}", service.image.unwrap_or(NOT_SET))?;

        if !endpoint.ports.is_empty() {
            writeln!(out, "\nExposed Ports:")?;
            for mapping in &endpoint.ports {
                writeln!(out, "- {mapping}")?;
            }
        }

        if !endpoint.env.is_empty() {
            writeln!(out, "\nEnvironment Variables:")?;
            for (key, value) in &endpoint.env {
                writeln!(out, "- {key}: {value}")?;
            }
        }

        writeln!(out)?;
    }

    writeln!(out, "To start this service:")?;
    writeln!(out, "  infracli run {service_name}")?;
    writeln!(out, "\nTo stop this service:")?;
    writeln!(out, "  infracli down {service_name}")
}
