use std::fmt;
use std::str::FromStr;

/// Storage class of a column, as far as the harness is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Integer,
    Timestamp,
    Uuid,
    Json,
}

impl ColumnType {
    pub fn name(self) -> &'static str {
        match self {
            ColumnType::Integer => "integer",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Uuid => "uuid",
            ColumnType::Json => "json",
        }
    }

    /// SQLite declared type used when creating the table.
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnType::Integer | ColumnType::Timestamp => "INTEGER",
            ColumnType::Uuid | ColumnType::Json => "TEXT",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The columns of the benchmark table, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Column {
    Id,
    KnowledgeBeginDate,
    KnowledgeEndDate,
    ClientId,
    DatabookId,
    DatasheetId,
    Data,
}

impl Column {
    pub const ALL: [Column; 7] = [
        Column::Id,
        Column::KnowledgeBeginDate,
        Column::KnowledgeEndDate,
        Column::ClientId,
        Column::DatabookId,
        Column::DatasheetId,
        Column::Data,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Column::Id => "id",
            Column::KnowledgeBeginDate => "knowledge_begin_date",
            Column::KnowledgeEndDate => "knowledge_end_date",
            Column::ClientId => "client_id",
            Column::DatabookId => "databook_id",
            Column::DatasheetId => "datasheet_id",
            Column::Data => "data",
        }
    }

    pub fn column_type(self) -> ColumnType {
        match self {
            Column::Id | Column::ClientId => ColumnType::Integer,
            Column::KnowledgeBeginDate | Column::KnowledgeEndDate => ColumnType::Timestamp,
            Column::DatabookId | Column::DatasheetId => ColumnType::Uuid,
            Column::Data => ColumnType::Json,
        }
    }

    pub fn is_nullable(self) -> bool {
        matches!(self, Column::KnowledgeEndDate | Column::Data)
    }

    pub fn is_primary_key(self) -> bool {
        self == Column::Id
    }

    /// Position of the column in [`Column::ALL`] and in `SELECT *` order.
    pub fn ordinal(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing a column name that is not part of the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownColumn(pub String);

impl fmt::Display for UnknownColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown column '{}'", self.0)
    }
}

impl std::error::Error for UnknownColumn {}

impl FromStr for Column {
    type Err = UnknownColumn;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Column::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownColumn(wanted.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinals_follow_declaration_order() {
        for (i, column) in Column::ALL.iter().enumerate() {
            assert_eq!(column.ordinal(), i);
        }
    }

    #[test]
    fn parse_is_case_insensitive_and_trims() {
        assert_eq!(" Databook_ID ".parse::<Column>(), Ok(Column::DatabookId));
        assert_eq!(
            "nope".parse::<Column>(),
            Err(UnknownColumn("nope".to_string()))
        );
    }

    #[test]
    fn only_end_date_and_data_are_nullable() {
        let nullable: Vec<Column> = Column::ALL
            .into_iter()
            .filter(|c| c.is_nullable())
            .collect();
        assert_eq!(nullable, vec![Column::KnowledgeEndDate, Column::Data]);
    }
}
