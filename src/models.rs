use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Speaker role for one turn of a ticket conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplyOwner {
    Customer,
    Agent,
}

impl ReplyOwner {
    /// Parse the wire representation used by the import format and the
    /// `kb_replies.owner` column. Returns `None` for anything that is not
    /// exactly `"customer"` or `"agent"`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "customer" => Some(Self::Customer),
            "agent" => Some(Self::Agent),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Agent => "agent",
        }
    }

    /// Human-readable transcript label
    pub fn speaker_label(self) -> &'static str {
        match self {
            Self::Customer => "用户",
            Self::Agent => "客服",
        }
    }
}

/// A historical support case
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ticket {
    pub id: Uuid,
    pub original_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One ordered turn in a ticket's conversation
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Reply {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub owner: String,
    pub content: String,
    pub sequence_order: i32,
    pub created_at: DateTime<Utc>,
}

impl Reply {
    /// Owner as a typed role; rows written through import always parse
    pub fn role(&self) -> Option<ReplyOwner> {
        ReplyOwner::parse(&self.owner)
    }
}

/// A ticket together with its full conversation, replies in sequence order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketWithReplies {
    pub ticket: Ticket,
    pub replies: Vec<Reply>,
}

/// Denormalized ticket projection stored in the vector index
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EmbeddedDocument {
    pub ticket_id: i64,
    pub title: String,
    pub category: Option<String>,
    pub content: String,
}

/// Import wire format: one ticket record
///
/// Unknown extra fields are ignored. `owner` values are validated during
/// import, not during deserialization, so one bad record cannot abort a
/// whole batch.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportTicket {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub replies: Vec<ImportReply>,
}

/// Import wire format: one reply record
#[derive(Debug, Clone, Deserialize)]
pub struct ImportReply {
    pub content: String,
    pub owner: String,
}

/// One skipped record during bulk import
#[derive(Debug, Clone, Serialize)]
pub struct ImportFailure {
    pub original_id: i64,
    pub reason: String,
}

/// Outcome of a bulk import
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub success_count: usize,
    pub error_count: usize,
    pub failures: Vec<ImportFailure>,
}

impl ImportReport {
    pub fn record_success(&mut self) {
        self.success_count += 1;
    }

    pub fn record_failure(&mut self, original_id: i64, reason: impl Into<String>) {
        self.error_count += 1;
        self.failures.push(ImportFailure {
            original_id,
            reason: reason.into(),
        });
    }
}

/// Decode a JSON array of import records.
///
/// Records that fail to decode (missing required field, wrong type) are
/// collected as failures instead of aborting the parse; the surrounding
/// array itself must still be valid JSON.
pub fn parse_import_records(json: &str) -> crate::Result<(Vec<ImportTicket>, Vec<ImportFailure>)> {
    let raw: Vec<serde_json::Value> = serde_json::from_str(json)?;

    let mut tickets = Vec::with_capacity(raw.len());
    let mut failures = Vec::new();

    for value in raw {
        let original_id = value.get("id").and_then(serde_json::Value::as_i64).unwrap_or_default();
        match serde_json::from_value::<ImportTicket>(value) {
            Ok(ticket) => tickets.push(ticket),
            Err(e) => failures.push(ImportFailure {
                original_id,
                reason: e.to_string(),
            }),
        }
    }

    Ok((tickets, failures))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_owner_parse() {
        assert_eq!(ReplyOwner::parse("customer"), Some(ReplyOwner::Customer));
        assert_eq!(ReplyOwner::parse("agent"), Some(ReplyOwner::Agent));
        assert_eq!(ReplyOwner::parse("bot"), None);
        assert_eq!(ReplyOwner::parse("Customer"), None);
        assert_eq!(ReplyOwner::parse(""), None);
    }

    #[test]
    fn test_parse_import_records_ignores_unknown_fields() {
        let json = r#"[
            {"id": 1, "title": "发货延迟问题", "description": "", "category": "物流",
             "replies": [{"content": "还没发货", "owner": "customer"}],
             "priority": "high", "assignee": "nobody"}
        ]"#;

        let (tickets, failures) = parse_import_records(json).unwrap();
        assert_eq!(tickets.len(), 1);
        assert!(failures.is_empty());
        assert_eq!(tickets[0].id, 1);
        assert_eq!(tickets[0].replies.len(), 1);
    }

    #[test]
    fn test_parse_import_records_collects_bad_records() {
        // Second record is missing the required title
        let json = r#"[
            {"id": 1, "title": "ok", "replies": []},
            {"id": 2, "replies": []},
            {"id": 3, "title": "also ok"}
        ]"#;

        let (tickets, failures) = parse_import_records(json).unwrap();
        assert_eq!(tickets.len(), 2);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].original_id, 2);
    }

    #[test]
    fn test_parse_import_records_invalid_array_is_an_error() {
        assert!(parse_import_records("not json").is_err());
    }

    #[test]
    fn test_import_report_fold() {
        let mut report = ImportReport::default();
        report.record_success();
        report.record_success();
        report.record_failure(42, "bad owner");

        assert_eq!(report.success_count, 2);
        assert_eq!(report.error_count, 1);
        assert_eq!(report.failures[0].original_id, 42);
    }
}
