use crate::types::{Column, Value};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// One fully materialized row of the benchmark table.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkRecord {
    pub id: i64,
    pub knowledge_begin_date: DateTime<Utc>,
    /// Only set once an explicit update has derived it from the begin date.
    pub knowledge_end_date: Option<DateTime<Utc>>,
    pub client_id: i64,
    pub databook_id: Uuid,
    pub datasheet_id: Uuid,
    pub data: Option<serde_json::Value>,
}

impl BenchmarkRecord {
    pub fn get(&self, column: Column) -> Value {
        match column {
            Column::Id => Value::Integer(self.id),
            Column::KnowledgeBeginDate => Value::Timestamp(self.knowledge_begin_date),
            Column::KnowledgeEndDate => self.knowledge_end_date.into(),
            Column::ClientId => Value::Integer(self.client_id),
            Column::DatabookId => Value::Uuid(self.databook_id),
            Column::DatasheetId => Value::Uuid(self.datasheet_id),
            Column::Data => self.data.clone().into(),
        }
    }
}

/// A row waiting to be inserted. The id is assigned by the database and the
/// end date always starts out empty.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub knowledge_begin_date: DateTime<Utc>,
    pub client_id: i64,
    pub databook_id: Uuid,
    pub datasheet_id: Uuid,
    pub data: Option<serde_json::Value>,
}

impl NewRecord {
    pub fn new(
        knowledge_begin_date: DateTime<Utc>,
        client_id: i64,
        databook_id: Uuid,
        datasheet_id: Uuid,
    ) -> Self {
        Self {
            knowledge_begin_date,
            client_id,
            databook_id,
            datasheet_id,
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}
