use std::collections::BTreeMap;

use guardian_core::error::{GuardianError, ToolExecutionError};
use guardian_core::intel::{
    Activity, Asn, Category, Intent, LookupResult, TagDetails, TagIpsPage, TagSummary,
    TimelineEntry,
};
use guardian_core::validation::{DEFAULT_LIMIT, DEFAULT_OFFSET, MAX_LIMIT, Pagination, validate_tag_name};
use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::client::GuardianClient;

pub const TOOL_LOOKUP: &str = "lookup";
pub const TOOL_TAGS_LIST: &str = "tags_list";
pub const TOOL_TAG_DETAILS: &str = "tag_details";
pub const TOOL_TAG_IPS: &str = "tag_ips";

const SUMMARY_TAG_PREVIEW: usize = 3;
const MISSING_BUCKET: &str = "unknown";

#[derive(Debug)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

/// The tool catalog, in stable order. Schemas mirror the client's validation rules.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: TOOL_LOOKUP,
            description: "Look up threat intelligence for a single IPv4 or IPv6 address: classification, tags, ASN, abuse contact and observed activity.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "ip": {
                        "type": "string",
                        "description": "Dotted-quad IPv4 or full eight-group IPv6 address",
                        "pattern": r"^((25[0-5]|2[0-4][0-9]|1[0-9][0-9]|[1-9]?[0-9])\.){3}(25[0-5]|2[0-4][0-9]|1[0-9][0-9]|[1-9]?[0-9])$|^([0-9a-fA-F]{1,4}:){7}[0-9a-fA-F]{1,4}$|^::1?$"
                    }
                },
                "required": ["ip"],
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: TOOL_TAGS_LIST,
            description: "List all known threat tags with category and intent breakdowns.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "include_descriptions": { "type": "boolean", "default": false }
                },
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: TOOL_TAG_DETAILS,
            description: "Show intent, category, references and timeline for one threat tag.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "tag": { "type": "string", "minLength": 1, "description": "Tag name as returned by tags_list" }
                },
                "required": ["tag"],
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: TOOL_TAG_IPS,
            description: "Page through IP addresses associated with a threat tag. Pass the returned snapshot back to keep paging consistent.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "tag": { "type": "string", "minLength": 1 },
                    "offset": { "type": "integer", "minimum": 0, "default": DEFAULT_OFFSET },
                    "limit": { "type": "integer", "minimum": 1, "maximum": MAX_LIMIT, "default": DEFAULT_LIMIT },
                    "snapshot": { "type": "string", "description": "Opaque snapshot token from a previous page" }
                },
                "required": ["tag"],
                "additionalProperties": false
            }),
        },
    ]
}

/// A tool invocation after its loose argument map has been coerced.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolRequest {
    Lookup { ip: String },
    TagsList { include_descriptions: bool },
    TagDetails { tag: String },
    TagIps { tag: String, pagination: Pagination },
}

impl ToolRequest {
    /// Missing strings become empty so the client reports its own validation message.
    /// `tag_ips` checks its tag before coercing the pagination arguments.
    pub fn parse(name: &str, args: &Map<String, Value>) -> Result<Self, GuardianError> {
        match name {
            TOOL_LOOKUP => Ok(ToolRequest::Lookup {
                ip: arg_string(args, "ip")?,
            }),
            TOOL_TAGS_LIST => Ok(ToolRequest::TagsList {
                include_descriptions: arg_bool(args, "include_descriptions", false)?,
            }),
            TOOL_TAG_DETAILS => Ok(ToolRequest::TagDetails {
                tag: arg_string(args, "tag")?,
            }),
            TOOL_TAG_IPS => {
                let tag = arg_string(args, "tag")?;
                validate_tag_name(&tag)?;
                let mut pagination = Pagination::new(
                    arg_number(args, "offset", DEFAULT_OFFSET as f64)?,
                    arg_number(args, "limit", DEFAULT_LIMIT as f64)?,
                );
                pagination.snapshot = arg_optional_string(args, "snapshot")?;
                Ok(ToolRequest::TagIps { tag, pagination })
            }
            _ => Err(GuardianError::UnknownOperation(name.to_string())),
        }
    }
}

/// Routes named tool calls to the API client and reshapes the responses.
#[derive(Debug, Clone)]
pub struct ToolDispatcher {
    client: GuardianClient,
}

impl ToolDispatcher {
    pub fn new(client: GuardianClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &GuardianClient {
        &self.client
    }

    pub fn list_operations(&self) -> Vec<ToolDefinition> {
        tool_definitions()
    }

    pub async fn dispatch(
        &self,
        name: &str,
        args: &Map<String, Value>,
    ) -> Result<Value, ToolExecutionError> {
        let result = async {
            let request = ToolRequest::parse(name, args)?;
            self.execute(request).await
        }
        .await;

        match &result {
            Ok(_) => tracing::debug!(tool = name, "tool call completed"),
            Err(err) => tracing::warn!(tool = name, code = err.code(), error = %err, "tool call failed"),
        }
        result
    }

    async fn execute(&self, request: ToolRequest) -> Result<Value, ToolExecutionError> {
        match request {
            ToolRequest::Lookup { ip } => {
                let result = self.client.lookup_ip(&ip).await?;
                to_output(lookup_output(result))
            }
            ToolRequest::TagsList {
                include_descriptions,
            } => {
                let tags = self.client.get_tags(include_descriptions).await?;
                to_output(tags_list_output(tags))
            }
            ToolRequest::TagDetails { tag } => {
                let details = self.client.get_tag_details(&tag).await?;
                to_output(tag_details_output(details))
            }
            ToolRequest::TagIps { tag, pagination } => {
                let page = self.client.get_tag_ips(&tag, &pagination).await?;
                to_output(tag_ips_output(page))
            }
        }
    }

    /// Dispose of the client and its connection pool.
    pub fn shutdown(self) {
        self.client.close();
    }
}

fn to_output<T: Serialize>(output: T) -> Result<Value, ToolExecutionError> {
    serde_json::to_value(output).map_err(ToolExecutionError::other)
}

#[derive(Debug, Serialize)]
pub struct LookupOutput {
    pub ip: String,
    pub classification: &'static str,
    pub tags: Vec<String>,
    pub threat_level: String,
    pub confidence: String,
    pub first_seen: Option<String>,
    pub last_seen: Option<String>,
    pub abuse_contact: Option<String>,
    pub asn: Option<Asn>,
    pub observed_activity: Vec<Activity>,
    pub blocklists: Vec<String>,
    pub summary: String,
}

pub fn lookup_output(result: LookupResult) -> LookupOutput {
    let threat_level = result
        .threat_level
        .unwrap_or_else(|| "unknown".to_string());
    let summary = lookup_summary(&threat_level, &result.tags, result.first_seen.as_deref());
    LookupOutput {
        ip: result.ip,
        classification: result.classification.as_str(),
        tags: result.tags,
        threat_level,
        confidence: result.confidence.unwrap_or_else(|| "low".to_string()),
        first_seen: result.first_seen,
        last_seen: result.last_seen,
        abuse_contact: result.abuse_contact.and_then(|contact| contact.email),
        asn: result.asn,
        observed_activity: result.activities,
        blocklists: result.blocklists,
        summary,
    }
}

fn lookup_summary(threat_level: &str, tags: &[String], first_seen: Option<&str>) -> String {
    let mut summary = format!("IP threat level: {}", threat_level.to_uppercase());
    if !tags.is_empty() {
        let preview: Vec<&str> = tags
            .iter()
            .take(SUMMARY_TAG_PREVIEW)
            .map(String::as_str)
            .collect();
        summary.push_str(&format!(
            " with {} associated tag(s): {}",
            tags.len(),
            preview.join(", ")
        ));
        if tags.len() > SUMMARY_TAG_PREVIEW {
            summary.push_str(&format!(" and {} more", tags.len() - SUMMARY_TAG_PREVIEW));
        }
    }
    if let Some(first_seen) = first_seen {
        summary.push_str(&format!(". First seen: {first_seen}"));
    }
    summary
}

#[derive(Debug, Serialize)]
pub struct TagListEntry {
    pub name: String,
    pub intent: Option<Intent>,
    pub category: Option<Category>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TagsListOutput {
    pub total_tags: usize,
    pub tags: Vec<String>,
    pub tag_details: Vec<TagListEntry>,
    pub categories: BTreeMap<String, usize>,
    pub intents: BTreeMap<String, usize>,
}

pub fn tags_list_output(tags: Vec<TagSummary>) -> TagsListOutput {
    let mut categories = BTreeMap::new();
    let mut intents = BTreeMap::new();
    for tag in &tags {
        let category = tag.category.map(Category::as_str).unwrap_or(MISSING_BUCKET);
        *categories.entry(category.to_string()).or_insert(0) += 1;
        let intent = tag.intent.map(Intent::as_str).unwrap_or(MISSING_BUCKET);
        *intents.entry(intent.to_string()).or_insert(0) += 1;
    }

    TagsListOutput {
        total_tags: tags.len(),
        tags: tags.iter().map(|tag| tag.name.clone()).collect(),
        tag_details: tags
            .into_iter()
            .map(|tag| TagListEntry {
                name: tag.name,
                intent: tag.intent,
                category: tag.category,
                description: tag.description,
            })
            .collect(),
        categories,
        intents,
    }
}

#[derive(Debug, Serialize)]
pub struct TagHeader {
    pub name: String,
    pub intent: Intent,
    pub category: Category,
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct TagDetailsOutput {
    pub tag: TagHeader,
    pub confidence: String,
    pub threat_context: String,
    pub references: Vec<String>,
    pub timeline: Vec<TimelineEntry>,
}

pub fn tag_details_output(details: TagDetails) -> TagDetailsOutput {
    let mut threat_context = format!(
        "This tag represents {} activity in the {} category",
        details.intent.as_str(),
        details.category.as_str()
    );
    if !details.description.trim().is_empty() {
        threat_context.push_str(&format!(". {}", details.description));
    }

    TagDetailsOutput {
        tag: TagHeader {
            name: details.name,
            intent: details.intent,
            category: details.category,
            description: details.description,
        },
        confidence: details.confidence.unwrap_or_else(|| "low".to_string()),
        threat_context,
        references: details.references,
        timeline: details.timeline,
    }
}

#[derive(Debug, Serialize)]
pub struct PaginationSummary {
    pub total: u64,
    pub returned: u64,
    pub offset: u64,
    pub limit: u64,
    pub has_more: bool,
}

#[derive(Debug, Serialize)]
pub struct TagIpsOutput {
    pub tag: String,
    pub ip_addresses: Vec<String>,
    pub pagination: PaginationSummary,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<String>,
}

pub fn tag_ips_output(page: TagIpsPage) -> TagIpsOutput {
    let returned = page.entries.len() as u64;
    TagIpsOutput {
        summary: format!(
            "Found {returned} IP addresses associated with tag '{}'",
            page.tag
        ),
        pagination: PaginationSummary {
            total: page.total,
            returned,
            offset: page.offset,
            limit: page.limit,
            has_more: page.offset.saturating_add(returned) < page.total,
        },
        tag: page.tag,
        ip_addresses: page.entries,
        last_update: page.last_update,
        snapshot: page.snapshot,
    }
}

fn arg_string(args: &Map<String, Value>, key: &str) -> Result<String, GuardianError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(v)) => Ok(v.clone()),
        Some(_) => Err(GuardianError::invalid_input(format!("'{key}' must be a string"))),
    }
}

fn arg_optional_string(args: &Map<String, Value>, key: &str) -> Result<Option<String>, GuardianError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(v)) if v.is_empty() => Ok(None),
        Some(Value::String(v)) => Ok(Some(v.clone())),
        Some(_) => Err(GuardianError::invalid_input(format!("'{key}' must be a string"))),
    }
}

fn arg_bool(args: &Map<String, Value>, key: &str, default: bool) -> Result<bool, GuardianError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(v)) => Ok(*v),
        Some(_) => Err(GuardianError::invalid_input(format!("'{key}' must be a boolean"))),
    }
}

fn arg_number(args: &Map<String, Value>, key: &str, default: f64) -> Result<f64, GuardianError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| GuardianError::invalid_input(format!("'{key}' must be a number"))),
        Some(_) => Err(GuardianError::invalid_input(format!("'{key}' must be a number"))),
    }
}

#[cfg(test)]
mod tests {
    use axum::Router;
    use axum::routing::get;
    use guardian_core::intel::{AbuseContact, Classification, Severity};

    use super::*;
    use crate::client::ClientConfig;
    use crate::test_support::{refused_base_url, spawn_upstream};

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    async fn offline_dispatcher() -> ToolDispatcher {
        let client = GuardianClient::new(
            ClientConfig::new("test-key").with_base_url(refused_base_url().await),
        )
        .unwrap();
        ToolDispatcher::new(client)
    }

    fn tag(name: &str, intent: Option<Intent>, category: Option<Category>) -> TagSummary {
        TagSummary {
            name: name.to_string(),
            intent,
            category,
            description: None,
        }
    }

    #[test]
    fn catalog_lists_four_tools_in_stable_order() {
        let names: Vec<&str> = tool_definitions().iter().map(|tool| tool.name).collect();
        assert_eq!(names, vec!["lookup", "tags_list", "tag_details", "tag_ips"]);
    }

    #[test]
    fn tag_ips_schema_matches_client_bounds() {
        let tool = tool_definitions()
            .into_iter()
            .find(|tool| tool.name == TOOL_TAG_IPS)
            .expect("tag_ips tool must exist");
        let props = &tool.input_schema["properties"];
        assert_eq!(props["limit"]["maximum"], 10_000);
        assert_eq!(props["limit"]["minimum"], 1);
        assert_eq!(props["limit"]["default"], 1000);
        assert_eq!(props["offset"]["minimum"], 0);
        assert_eq!(tool.input_schema["required"], json!(["tag"]));
    }

    #[test]
    fn parse_builds_typed_requests() {
        assert_eq!(
            ToolRequest::parse("lookup", &args(json!({"ip": "8.8.8.8"}))).unwrap(),
            ToolRequest::Lookup { ip: "8.8.8.8".to_string() }
        );
        assert_eq!(
            ToolRequest::parse("tags_list", &Map::new()).unwrap(),
            ToolRequest::TagsList { include_descriptions: false }
        );
        let request = ToolRequest::parse(
            "tag_ips",
            &args(json!({"tag": "Mirai", "offset": 5.7, "limit": 100.9, "snapshot": "s1"})),
        )
        .unwrap();
        assert_eq!(
            request,
            ToolRequest::TagIps {
                tag: "Mirai".to_string(),
                pagination: Pagination::new(5.7, 100.9).with_snapshot("s1"),
            }
        );
    }

    #[test]
    fn parse_rejects_wrongly_typed_arguments() {
        let err = ToolRequest::parse("lookup", &args(json!({"ip": 8}))).unwrap_err();
        assert_eq!(err.to_string(), "'ip' must be a string");
        let err = ToolRequest::parse("tags_list", &args(json!({"include_descriptions": "yes"})))
            .unwrap_err();
        assert_eq!(err.to_string(), "'include_descriptions' must be a boolean");
        let err = ToolRequest::parse("tag_ips", &args(json!({"tag": "x", "limit": "10"}))).unwrap_err();
        assert_eq!(err.to_string(), "'limit' must be a number");
    }

    #[test]
    fn tag_ips_checks_tag_before_pagination_types() {
        let err = ToolRequest::parse("tag_ips", &args(json!({"limit": "10"}))).unwrap_err();
        assert_eq!(err.to_string(), "Tag name is required");
        let err = ToolRequest::parse("tag_ips", &args(json!({"tag": "  ", "offset": -1}))).unwrap_err();
        assert_eq!(err.to_string(), "Tag name is required");
    }

    #[tokio::test]
    async fn unknown_tool_is_wrapped() {
        let dispatcher = offline_dispatcher().await;
        let err = dispatcher.dispatch("unknown_tool", &Map::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "Tool execution failed: Unknown tool: unknown_tool");
    }

    #[tokio::test]
    async fn validation_errors_are_wrapped_with_original_text() {
        let dispatcher = offline_dispatcher().await;

        let err = dispatcher.dispatch("lookup", &Map::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "Tool execution failed: Invalid IP address format");
        assert!(matches!(err.kind(), Some(GuardianError::InvalidInput(_))));

        let err = dispatcher
            .dispatch("tag_details", &args(json!({"tag": " "})))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Tool execution failed: Tag name is required");

        let err = dispatcher
            .dispatch("tag_ips", &args(json!({"tag": "Mirai", "limit": 10001})))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Tool execution failed: Limit cannot exceed 10,000");
    }

    #[tokio::test]
    async fn network_errors_are_wrapped() {
        let dispatcher = offline_dispatcher().await;
        let err = dispatcher
            .dispatch("lookup", &args(json!({"ip": "8.8.8.8"})))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Tool execution failed: Unable to connect to Guardian Intel API"
        );
    }

    #[test]
    fn lookup_output_renames_and_defaults() {
        let output = lookup_output(LookupResult {
            ip: "1.2.3.4".to_string(),
            classification: Classification::Malicious,
            threat_level: None,
            confidence: None,
            tags: Vec::new(),
            first_seen: None,
            last_seen: None,
            abuse_contact: Some(AbuseContact {
                email: Some("abuse@example.net".to_string()),
                ..AbuseContact::default()
            }),
            asn: Some(Asn {
                number: "AS4134".to_string(),
                name: Some("CHINANET".to_string()),
                country: Some("CN".to_string()),
            }),
            blocklists: vec!["spamhaus".to_string()],
            activities: vec![Activity {
                kind: "scan".to_string(),
                description: "Telnet sweep".to_string(),
                timestamp: "2024-03-01T10:00:00Z".to_string(),
                severity: Severity::High,
            }],
        });
        let value = serde_json::to_value(&output).unwrap();

        assert_eq!(value["threat_level"], "unknown");
        assert_eq!(value["confidence"], "low");
        assert_eq!(value["tags"], json!([]));
        assert_eq!(value["abuse_contact"], "abuse@example.net");
        assert_eq!(value["asn"], json!({"number": "AS4134", "name": "CHINANET", "country": "CN"}));
        assert_eq!(value["first_seen"], Value::Null);
        assert_eq!(value["observed_activity"][0]["type"], "scan");
        assert_eq!(value["observed_activity"][0]["severity"], "high");
        assert_eq!(value["summary"], "IP threat level: UNKNOWN");
    }

    #[test]
    fn lookup_summary_previews_three_tags() {
        let tags: Vec<String> = ["Mirai", "SSH Bruteforcer", "Telnet Scanner", "ZMap", "Masscan"]
            .iter()
            .map(|t| t.to_string())
            .collect();
        assert_eq!(
            lookup_summary("high", &tags, Some("2024-01-02")),
            "IP threat level: HIGH with 5 associated tag(s): Mirai, SSH Bruteforcer, Telnet Scanner and 2 more. First seen: 2024-01-02"
        );
        assert_eq!(
            lookup_summary("low", &tags[..2], None),
            "IP threat level: LOW with 2 associated tag(s): Mirai, SSH Bruteforcer"
        );
    }

    #[test]
    fn tags_list_histograms_cover_every_returned_tag() {
        let output = tags_list_output(vec![
            tag("Mirai", Some(Intent::Malicious), Some(Category::Activity)),
            tag("Masscan", Some(Intent::Suspicious), Some(Category::Tool)),
            tag("APT28", Some(Intent::Malicious), Some(Category::Actor)),
        ]);
        assert_eq!(output.total_tags, 3);
        assert_eq!(output.tags, vec!["Mirai", "Masscan", "APT28"]);
        assert_eq!(output.categories.values().sum::<usize>(), 3);
        assert_eq!(output.categories["activity"], 1);
        assert_eq!(output.categories["tool"], 1);
        assert_eq!(output.categories["actor"], 1);
        assert_eq!(output.intents["malicious"], 2);
        assert_eq!(output.intents["suspicious"], 1);
        assert_eq!(output.intents.values().sum::<usize>(), 3);

        let value = serde_json::to_value(&output).unwrap();
        assert_eq!(value["tag_details"][0]["description"], Value::Null);
    }

    #[test]
    fn tags_without_category_or_intent_land_in_catch_all() {
        let output = tags_list_output(vec![tag("Mystery", None, None)]);
        assert_eq!(output.categories["unknown"], 1);
        assert_eq!(output.intents["unknown"], 1);
    }

    #[test]
    fn tag_details_threat_context_appends_description() {
        let details = |description: &str| TagDetails {
            name: "Mirai".to_string(),
            intent: Intent::Malicious,
            category: Category::Activity,
            description: description.to_string(),
            confidence: Some("high".to_string()),
            references: vec!["https://example.org/mirai".to_string()],
            timeline: Vec::new(),
        };

        let output = tag_details_output(details("Botnet scanning for IoT devices"));
        assert_eq!(
            output.threat_context,
            "This tag represents malicious activity in the activity category. Botnet scanning for IoT devices"
        );
        assert_eq!(output.confidence, "high");

        let output = tag_details_output(details(""));
        assert_eq!(
            output.threat_context,
            "This tag represents malicious activity in the activity category"
        );
    }

    #[test]
    fn tag_ips_has_more_follows_total() {
        let page = |total| TagIpsPage {
            tag: "Mirai".to_string(),
            entries: vec!["1.1.1.1".to_string(), "2.2.2.2".to_string()],
            total,
            offset: 0,
            limit: 2,
            last_update: None,
            snapshot: None,
        };

        let output = tag_ips_output(page(1000));
        assert!(output.pagination.has_more);
        assert_eq!(output.pagination.returned, 2);
        assert_eq!(output.summary, "Found 2 IP addresses associated with tag 'Mirai'");

        let output = tag_ips_output(page(2));
        assert!(!output.pagination.has_more);
    }

    #[test]
    fn tag_ips_has_more_survives_offset_at_u64_max() {
        let output = tag_ips_output(TagIpsPage {
            tag: "Mirai".to_string(),
            entries: vec!["1.1.1.1".to_string()],
            total: 5,
            offset: u64::MAX,
            limit: 10,
            last_update: None,
            snapshot: None,
        });
        assert!(!output.pagination.has_more);
        assert_eq!(output.pagination.offset, u64::MAX);
        assert_eq!(output.pagination.returned, 1);
    }

    #[tokio::test]
    async fn tag_ips_round_trip_through_dispatch() {
        let router = Router::new().route(
            "/tags/{name}/ips",
            get(|| async {
                axum::Json(json!({
                    "result": {
                        "tag": "Mirai",
                        "entries": ["5.5.5.5", "4.4.4.4", "3.3.3.3"],
                        "total": 3,
                        "offset": 0,
                        "limit": 10,
                        "snapshot": "snap-7"
                    }
                }))
            }),
        );
        let client = GuardianClient::new(
            ClientConfig::new("k").with_base_url(spawn_upstream(router).await),
        )
        .unwrap();
        let dispatcher = ToolDispatcher::new(client);

        let value = dispatcher
            .dispatch("tag_ips", &args(json!({"tag": "Mirai", "limit": 10})))
            .await
            .unwrap();
        assert_eq!(value["ip_addresses"], json!(["5.5.5.5", "4.4.4.4", "3.3.3.3"]));
        assert_eq!(value["pagination"]["has_more"], false);
        assert_eq!(value["snapshot"], "snap-7");
        assert!(value.get("last_update").is_none());
    }
}
