//! Logical schema model
//!
//! The validated description of modules, entities, attributes and indexes
//! handed over by ingestion. Duplicate identifiers and dangling references
//! are rejected before a model reaches this crate, so nothing here
//! re-validates them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Schema used when neither the model nor the build options name one
pub const DEFAULT_SCHEMA: &str = "dbo";

/// Portable column data type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DataType {
    /// 32-bit integer
    Integer,

    /// 64-bit integer
    LongInteger,

    /// Exact numeric
    Decimal { precision: u8, scale: u8 },

    /// Boolean flag
    Boolean,

    /// Variable-length text; `None` means unbounded
    Text { length: Option<u32> },

    /// Calendar date
    Date,

    /// Time of day
    Time,

    /// Date and time
    DateTime,

    /// Binary payload
    Binary,
}

impl DataType {
    /// Whether default literals of this type are quoted
    pub fn is_textual(&self) -> bool {
        matches!(self, Self::Text { .. } | Self::Date | Self::Time | Self::DateTime)
    }

    /// Default value as a SQL literal of this type
    ///
    /// `None` when the value is not a literal of the type. Textual values
    /// are always quoted; an empty text default is the empty string.
    pub fn default_literal(&self, value: &str) -> Option<String> {
        if self.is_textual() {
            return Some(format!("'{}'", value.replace('\'', "''")));
        }

        let value = value.trim();
        match self {
            Self::Boolean => match value.to_ascii_lowercase().as_str() {
                "true" | "1" => Some("TRUE".to_string()),
                "false" | "0" => Some("FALSE".to_string()),
                _ => None,
            },
            Self::Integer | Self::LongInteger => is_number(value, false).then(|| value.to_string()),
            Self::Decimal { .. } => is_number(value, true).then(|| value.to_string()),
            Self::Binary => {
                let hex = value
                    .strip_prefix("0x")
                    .or_else(|| value.strip_prefix("0X"))
                    .unwrap_or(value);
                (!hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit())).then(|| format!("'\\x{}'", hex))
            }
            _ => None,
        }
    }
}

/// Optionally signed digits, with at most one decimal point when allowed
fn is_number(value: &str, fractional: bool) -> bool {
    let digits = value.strip_prefix(['-', '+']).unwrap_or(value);
    let (whole, fraction) = match digits.split_once('.') {
        Some((whole, fraction)) if fractional => (whole, fraction),
        Some(_) => return false,
        None => (digits, ""),
    };

    !(whole.is_empty() && fraction.is_empty())
        && whole.chars().all(|c| c.is_ascii_digit())
        && fraction.chars().all(|c| c.is_ascii_digit())
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "INT"),
            Self::LongInteger => write!(f, "BIGINT"),
            Self::Decimal { precision, scale } => write!(f, "DECIMAL({}, {})", precision, scale),
            Self::Boolean => write!(f, "BOOLEAN"),
            Self::Text { length: Some(length) } => write!(f, "VARCHAR({})", length),
            Self::Text { length: None } => write!(f, "TEXT"),
            Self::Date => write!(f, "DATE"),
            Self::Time => write!(f, "TIME"),
            Self::DateTime => write!(f, "TIMESTAMP"),
            Self::Binary => write!(f, "BYTEA"),
        }
    }
}

/// What happens to referencing rows when the referenced row is deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeleteRule {
    /// Deletion is refused while references exist
    Protect,

    /// Referencing rows are deleted too
    Delete,

    /// No integrity is enforced at all
    Ignore,
}

/// Physical location of an entity in the source platform
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhysicalTable {
    /// Catalog/database, when the platform distinguishes one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,

    /// Schema name
    pub schema: String,

    /// Table name
    pub table: String,
}

impl PhysicalTable {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            catalog: None,
            schema: schema.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for PhysicalTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.catalog {
            Some(catalog) => write!(f, "{}.{}.{}", catalog, self.schema, self.table),
            None => write!(f, "{}.{}", self.schema, self.table),
        }
    }
}

/// Logical address of an entity: module + entity name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub module: String,
    pub entity: String,
}

impl EntityRef {
    pub fn new(module: impl Into<String>, entity: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            entity: entity.into(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.entity)
    }
}

/// A reference from an attribute to another entity's primary key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeReference {
    /// Referenced entity
    pub target: EntityRef,

    /// Configured delete rule
    pub delete_rule: DeleteRule,
}

/// An attribute (column) of an entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attribute {
    /// Logical identifier, unique within the entity
    pub logical_name: String,

    /// Column name in the source platform
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_name: Option<String>,

    pub data_type: DataType,

    /// Declared as required by the designer
    #[serde(default)]
    pub is_mandatory: bool,

    /// Participates in the primary key
    #[serde(default)]
    pub is_identifier: bool,

    /// Value generated by the platform
    #[serde(default)]
    pub is_auto_number: bool,

    /// Inactive attributes are kept for history but never emitted
    #[serde(default = "default_true")]
    pub is_active: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<AttributeReference>,
}

fn default_true() -> bool {
    true
}

impl Attribute {
    /// Create an active, optional attribute
    pub fn new(logical_name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            logical_name: logical_name.into(),
            physical_name: None,
            data_type,
            is_mandatory: false,
            is_identifier: false,
            is_auto_number: false,
            is_active: true,
            default_value: None,
            description: None,
            reference: None,
        }
    }

    /// Mark as (part of) the primary key; identifiers are always mandatory
    pub fn identifier(mut self) -> Self {
        self.is_identifier = true;
        self.is_mandatory = true;
        self
    }

    pub fn mandatory(mut self) -> Self {
        self.is_mandatory = true;
        self
    }

    pub fn auto_number(mut self) -> Self {
        self.is_auto_number = true;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn with_physical_name(mut self, name: impl Into<String>) -> Self {
        self.physical_name = Some(name.into());
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_reference(mut self, target: EntityRef, delete_rule: DeleteRule) -> Self {
        self.reference = Some(AttributeReference { target, delete_rule });
        self
    }

    /// Column name used to key profile observations
    pub fn profile_column(&self) -> &str {
        self.physical_name.as_deref().unwrap_or(&self.logical_name)
    }
}

/// An index declared on an entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Index {
    /// Logical identifier, unique within the entity
    pub name: String,

    /// Ordered attribute logical names
    pub attributes: Vec<String>,

    /// Candidate for a unique constraint
    #[serde(default)]
    pub is_unique: bool,

    /// Created automatically by the source platform
    #[serde(default)]
    pub is_platform_auto: bool,
}

impl Index {
    pub fn new(name: impl Into<String>, attributes: Vec<String>) -> Self {
        Self {
            name: name.into(),
            attributes,
            is_unique: false,
            is_platform_auto: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }

    pub fn platform_auto(mut self) -> Self {
        self.is_platform_auto = true;
        self
    }
}

/// An entity (table)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
    /// Logical identifier, unique within the module
    pub logical_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical: Option<PhysicalTable>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Ordered attributes
    pub attributes: Vec<Attribute>,

    #[serde(default)]
    pub indexes: Vec<Index>,
}

impl Entity {
    pub fn new(logical_name: impl Into<String>) -> Self {
        Self {
            logical_name: logical_name.into(),
            physical: None,
            description: None,
            attributes: Vec::new(),
            indexes: Vec::new(),
        }
    }

    pub fn with_physical(mut self, physical: PhysicalTable) -> Self {
        self.physical = Some(physical);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn with_index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    /// Find an attribute by logical name
    pub fn attribute(&self, logical_name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.logical_name == logical_name)
    }

    /// Primary-key attributes in declaration order
    pub fn identifiers(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter().filter(|a| a.is_identifier)
    }

    /// Schema and table used to key profile observations
    pub fn profile_table(&self) -> (&str, &str) {
        match &self.physical {
            Some(physical) => (physical.schema.as_str(), physical.table.as_str()),
            None => (DEFAULT_SCHEMA, self.logical_name.as_str()),
        }
    }
}

/// A module groups entities
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub entities: Vec<Entity>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entities: Vec::new(),
        }
    }

    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.entities.push(entity);
        self
    }
}

/// The validated logical schema
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogicalSchemaModel {
    pub modules: Vec<Module>,
}

impl LogicalSchemaModel {
    pub fn new(modules: Vec<Module>) -> Self {
        Self { modules }
    }

    /// Parse a model from its JSON form
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Every entity with its module, in declaration order
    pub fn entities(&self) -> impl Iterator<Item = (&Module, &Entity)> {
        self.modules
            .iter()
            .flat_map(|module| module.entities.iter().map(move |entity| (module, entity)))
    }

    /// Resolve an entity reference
    pub fn entity(&self, reference: &EntityRef) -> Option<&Entity> {
        self.modules
            .iter()
            .find(|m| m.name == reference.module)?
            .entities
            .iter()
            .find(|e| e.logical_name == reference.entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_literals_follow_the_column_type() {
        assert_eq!(DataType::Integer.default_literal("42").as_deref(), Some("42"));
        assert_eq!(DataType::LongInteger.default_literal(" -7 ").as_deref(), Some("-7"));
        assert_eq!(
            DataType::Decimal { precision: 18, scale: 2 }.default_literal("19.99").as_deref(),
            Some("19.99")
        );
        assert_eq!(DataType::Boolean.default_literal("True").as_deref(), Some("TRUE"));
        assert_eq!(DataType::Boolean.default_literal("0").as_deref(), Some("FALSE"));
        assert_eq!(DataType::Date.default_literal("2024-01-01").as_deref(), Some("'2024-01-01'"));
        assert_eq!(DataType::Text { length: None }.default_literal("it's").as_deref(), Some("'it''s'"));
        assert_eq!(DataType::Binary.default_literal("0xFF").as_deref(), Some("'\\xFF'"));

        assert_eq!(DataType::Integer.default_literal(""), None);
        assert_eq!(DataType::Integer.default_literal("1.5"), None);
        assert_eq!(DataType::Integer.default_literal("1; DROP TABLE t"), None);
        assert_eq!(DataType::Decimal { precision: 5, scale: 0 }.default_literal("1.2.3"), None);
        assert_eq!(DataType::Boolean.default_literal("yes"), None);
        assert_eq!(DataType::Binary.default_literal("zz"), None);
    }

    fn sales() -> LogicalSchemaModel {
        LogicalSchemaModel::new(vec![Module::new("Sales")
            .with_entity(
                Entity::new("Customer")
                    .with_attribute(Attribute::new("Id", DataType::LongInteger).identifier()),
            )
            .with_entity(
                Entity::new("Order")
                    .with_physical(PhysicalTable::new("OSUSR", "OSUSR_ABC_ORDER"))
                    .with_attribute(Attribute::new("Id", DataType::LongInteger).identifier())
                    .with_attribute(
                        Attribute::new("CustomerId", DataType::LongInteger)
                            .with_physical_name("CUSTOMERID")
                            .with_reference(EntityRef::new("Sales", "Customer"), DeleteRule::Protect),
                    ),
            )])
    }

    #[test]
    fn data_type_display() {
        assert_eq!(DataType::Text { length: Some(50) }.to_string(), "VARCHAR(50)");
        assert_eq!(DataType::Decimal { precision: 18, scale: 2 }.to_string(), "DECIMAL(18, 2)");
        assert_eq!(DataType::Text { length: None }.to_string(), "TEXT");
    }

    #[test]
    fn entity_lookup() {
        let model = sales();
        assert_eq!(model.entities().count(), 2);

        let order = model.entity(&EntityRef::new("Sales", "Order")).unwrap();
        assert_eq!(order.profile_table(), ("OSUSR", "OSUSR_ABC_ORDER"));
        assert_eq!(order.attribute("CustomerId").unwrap().profile_column(), "CUSTOMERID");
        assert!(model.entity(&EntityRef::new("sales", "Order")).is_none());
    }

    #[test]
    fn profile_keys_fall_back_to_logical_names() {
        let model = sales();
        let customer = model.entity(&EntityRef::new("Sales", "Customer")).unwrap();
        assert_eq!(customer.profile_table(), (DEFAULT_SCHEMA, "Customer"));
        assert_eq!(customer.attribute("Id").unwrap().profile_column(), "Id");
    }

    #[test]
    fn json_defaults() {
        let json = r#"{
            "modules": [{
                "name": "Sales",
                "entities": [{
                    "logical_name": "Order",
                    "attributes": [{ "logical_name": "Id", "data_type": { "type": "integer" }, "is_identifier": true }]
                }]
            }]
        }"#;

        let model = LogicalSchemaModel::from_json(json).unwrap();
        let (_, order) = model.entities().next().unwrap();
        assert!(order.attributes[0].is_active);
        assert!(order.indexes.is_empty());
    }
}
