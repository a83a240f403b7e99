//! The typed representation of a single schema delta.
//!
//! Changes are built from the extension's classification records and never
//! validated beyond kind recognition: the extension is the single source of
//! truth for what a change is and which tier it belongs to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// Safety tier assigned to a change by the extension.
///
/// Tiers are disjoint. Consumers match exhaustively so a new tier is a
/// compile-time change rather than a silent fallthrough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyTier {
    /// Additive, eligible for automatic application.
    Safe,
    /// Potentially data-lossy; requires explicit opt-in.
    Destructive,
    /// Never applied automatically; requires manual, out-of-band execution.
    Breaking,
}

impl SafetyTier {
    /// All tiers in rendering order.
    pub const ALL: [SafetyTier; 3] = [
        SafetyTier::Safe,
        SafetyTier::Destructive,
        SafetyTier::Breaking,
    ];
}

impl fmt::Display for SafetyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SafetyTier::Safe => write!(f, "safe"),
            SafetyTier::Destructive => write!(f, "destructive"),
            SafetyTier::Breaking => write!(f, "breaking"),
        }
    }
}

/// Kind of schema delta. Unrecognized tags are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChangeKind {
    CreateSchema,
    DropSchema,
    CreateTable,
    DropTable,
    AddColumn,
    DropColumn,
    AlterColumnType,
    AlterColumnNullable,
    AlterColumnDefault,
    CreateIndex,
    DropIndex,
    /// A kind this client does not know about.
    Other(String),
}

impl ChangeKind {
    /// The wire tag for this kind.
    pub fn as_str(&self) -> &str {
        match self {
            ChangeKind::CreateSchema => "CreateSchema",
            ChangeKind::DropSchema => "DropSchema",
            ChangeKind::CreateTable => "CreateTable",
            ChangeKind::DropTable => "DropTable",
            ChangeKind::AddColumn => "AddColumn",
            ChangeKind::DropColumn => "DropColumn",
            ChangeKind::AlterColumnType => "AlterColumnType",
            ChangeKind::AlterColumnNullable => "AlterColumnNullable",
            ChangeKind::AlterColumnDefault => "AlterColumnDefault",
            ChangeKind::CreateIndex => "CreateIndex",
            ChangeKind::DropIndex => "DropIndex",
            ChangeKind::Other(tag) => tag,
        }
    }

    /// Whether this kind is one of the fixed enumeration.
    pub fn is_known(&self) -> bool {
        !matches!(self, ChangeKind::Other(_))
    }
}

impl FromStr for ChangeKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "CreateSchema" => ChangeKind::CreateSchema,
            "DropSchema" => ChangeKind::DropSchema,
            "CreateTable" => ChangeKind::CreateTable,
            "DropTable" => ChangeKind::DropTable,
            "AddColumn" => ChangeKind::AddColumn,
            "DropColumn" => ChangeKind::DropColumn,
            "AlterColumnType" => ChangeKind::AlterColumnType,
            "AlterColumnNullable" => ChangeKind::AlterColumnNullable,
            "AlterColumnDefault" => ChangeKind::AlterColumnDefault,
            "CreateIndex" => ChangeKind::CreateIndex,
            "DropIndex" => ChangeKind::DropIndex,
            other => ChangeKind::Other(other.to_string()),
        })
    }
}

impl From<String> for ChangeKind {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(kind) => kind,
            Err(never) => match never {},
        }
    }
}

impl From<ChangeKind> for String {
    fn from(kind: ChangeKind) -> Self {
        match kind {
            ChangeKind::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl Default for ChangeKind {
    /// A record that carried no kind tag at all.
    fn default() -> Self {
        ChangeKind::Other(String::new())
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label for a change with neither a description nor a kind tag.
pub const UNCLASSIFIED_LABEL: &str = "(unclassified change)";

fn null_as_default_kind<'de, D>(deserializer: D) -> std::result::Result<ChangeKind, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .map(ChangeKind::from)
        .unwrap_or_default())
}

fn null_as_empty_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// One atomic schema delta as classified by the extension.
///
/// Optional fields are omitted from serialized output when absent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Change {
    /// What kind of delta this is.
    #[serde(
        rename = "change_type",
        default,
        deserialize_with = "null_as_default_kind"
    )]
    pub kind: ChangeKind,
    /// Schema the change lives in.
    #[serde(
        default,
        deserialize_with = "null_as_empty_string",
        skip_serializing_if = "String::is_empty"
    )]
    pub schema: String,
    /// Table, for table-, column- and index-level changes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    /// Column, for column-level changes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    /// Index, for index-level changes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    /// Free-text description supplied by the extension.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Tier label the extension attached to the record. Passed through as
    /// sent; the tier list a change arrives in is authoritative.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safety: Option<String>,
    /// SQL the extension would run for this change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    /// Previous column type (AlterColumnType only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_type: Option<String>,
    /// New column type (AlterColumnType only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_type: Option<String>,
}

impl Change {
    /// A change of `kind` in `schema` with every optional field absent.
    pub fn new(kind: ChangeKind, schema: impl Into<String>) -> Self {
        Self {
            kind,
            schema: schema.into(),
            table: None,
            column: None,
            index: None,
            description: None,
            safety: None,
            sql: None,
            old_type: None,
            new_type: None,
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = Some(sql.into());
        self
    }

    pub fn with_types(mut self, old_type: impl Into<String>, new_type: impl Into<String>) -> Self {
        self.old_type = Some(old_type.into());
        self.new_type = Some(new_type.into());
        self
    }

    /// `schema.table`, or just the schema when no table is present.
    pub fn qualified_table(&self) -> String {
        match &self.table {
            Some(table) => format!("{}.{}", self.schema, table),
            None => self.schema.clone(),
        }
    }

    /// `(old, new)` when both sides of a type change are known.
    pub fn type_transition(&self) -> Option<(&str, &str)> {
        match (&self.old_type, &self.new_type) {
            (Some(old), Some(new)) => Some((old.as_str(), new.as_str())),
            _ => None,
        }
    }

    /// Text used when the kind is not recognized: the description if it is
    /// non-empty, otherwise the raw kind tag, otherwise a placeholder.
    pub fn fallback_label(&self) -> &str {
        match self.description.as_deref() {
            Some(d) if !d.is_empty() => d,
            _ if !self.kind.as_str().is_empty() => self.kind.as_str(),
            _ => UNCLASSIFIED_LABEL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_kind_parses() {
        assert_eq!(
            "AlterColumnType".parse::<ChangeKind>().unwrap(),
            ChangeKind::AlterColumnType
        );
        assert!(ChangeKind::DropIndex.is_known());
    }

    #[test]
    fn test_unknown_kind_is_kept_verbatim() {
        let kind: ChangeKind = "CreateTrigger".parse().unwrap();
        assert_eq!(kind, ChangeKind::Other("CreateTrigger".to_string()));
        assert_eq!(kind.as_str(), "CreateTrigger");
        assert!(!kind.is_known());
    }

    #[test]
    fn test_deserialize_extension_record() {
        let json = r#"{
            "change_type": "AlterColumnType",
            "schema": "public",
            "table": "users",
            "column": "age",
            "safety": "breaking",
            "old_type": "integer",
            "new_type": "bigint"
        }"#;
        let change: Change = serde_json::from_str(json).unwrap();
        assert_eq!(change.kind, ChangeKind::AlterColumnType);
        assert_eq!(change.qualified_table(), "public.users");
        assert_eq!(change.type_transition(), Some(("integer", "bigint")));
        assert_eq!(change.safety.as_deref(), Some("breaking"));
        assert!(change.index.is_none());
    }

    #[test]
    fn test_null_fields_are_absent() {
        let json = r#"{"change_type": "CreateSchema", "schema": null, "table": null}"#;
        let change: Change = serde_json::from_str(json).unwrap();
        assert_eq!(change, Change::new(ChangeKind::CreateSchema, ""));
    }

    #[test]
    fn test_serialize_omits_absent_fields() {
        let change = Change::new(ChangeKind::CreateSchema, "app");
        let json = serde_json::to_string(&change).unwrap();
        assert_eq!(json, r#"{"change_type":"CreateSchema","schema":"app"}"#);
    }

    #[test]
    fn test_unknown_kind_serializes_as_raw_tag() {
        let change = Change::new(ChangeKind::Other("CreateView".into()), "app");
        let json = serde_json::to_string(&change).unwrap();
        assert!(json.contains(r#""change_type":"CreateView""#));
    }

    #[test]
    fn test_fallback_label_prefers_description() {
        let change = Change::new(ChangeKind::Other("CreateView".into()), "app")
            .with_description("create view app.v");
        assert_eq!(change.fallback_label(), "create view app.v");

        let bare = Change::new(ChangeKind::Other("CreateView".into()), "app");
        assert_eq!(bare.fallback_label(), "CreateView");

        let empty = bare.clone().with_description("");
        assert_eq!(empty.fallback_label(), "CreateView");

        let untagged = Change::new(ChangeKind::default(), "app").with_description("");
        assert_eq!(untagged.fallback_label(), UNCLASSIFIED_LABEL);
    }

    #[test]
    fn test_missing_or_null_kind_is_unclassified() {
        for json in [
            r#"{"schema": "app", "description": "create view app.v"}"#,
            r#"{"change_type": null, "schema": "app", "description": "create view app.v"}"#,
        ] {
            let change: Change = serde_json::from_str(json).unwrap();
            assert_eq!(change.kind, ChangeKind::Other(String::new()));
            assert!(!change.kind.is_known());
            assert_eq!(change.fallback_label(), "create view app.v");
        }
    }

    #[test]
    fn test_type_transition_requires_both_sides() {
        let mut change = Change::new(ChangeKind::AlterColumnType, "public");
        change.old_type = Some("int".into());
        assert_eq!(change.type_transition(), None);
    }
}
