use super::storage::{SqlValue, Statement};
use crate::pagination::PageRequest;

/// Appends SQL fragments and numbers `$n` placeholders as values are bound.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    sql: String,
    params: Vec<SqlValue>,
    has_where: bool,
}

impl QueryBuilder {
    pub fn new(sql: impl Into<String>) -> Self {
        let sql = sql.into();
        let has_where = super::returning::find_keyword(&sql, "WHERE").is_some();
        Self {
            sql,
            params: Vec::new(),
            has_where,
        }
    }

    pub fn push(&mut self, fragment: &str) -> &mut Self {
        self.sql.push_str(fragment);
        self
    }

    pub fn push_bind(&mut self, value: impl Into<SqlValue>) -> &mut Self {
        self.params.push(value.into());
        self.sql.push('$');
        self.sql.push_str(&self.params.len().to_string());
        self
    }

    /// Adds `column = $n` to the WHERE clause.
    pub fn and_eq(&mut self, column: &str, value: impl Into<SqlValue>) -> &mut Self {
        self.and_where(column);
        self.push(" = ").push_bind(value)
    }

    /// Opens the WHERE clause on first use, then joins with AND.
    pub fn and_where(&mut self, condition: &str) -> &mut Self {
        if self.has_where {
            self.sql.push_str(" AND ");
        } else {
            self.sql.push_str(" WHERE ");
            self.has_where = true;
        }
        self.sql.push_str(condition);
        self
    }

    /// LIMIT/OFFSET go in as literals; some engines reject them as bound parameters.
    pub fn push_page(&mut self, page: &PageRequest) -> &mut Self {
        self.sql
            .push_str(&format!(" LIMIT {} OFFSET {}", page.limit, page.offset()));
        self
    }

    pub fn build(self) -> Statement {
        Statement {
            sql: self.sql,
            params: self.params,
        }
    }
}

/// Partial update of one row: only the columns that were supplied are written.
#[derive(Debug, Clone)]
pub struct Patch {
    table: &'static str,
    columns: Vec<(&'static str, SqlValue)>,
}

impl Patch {
    pub fn new(table: &'static str) -> Self {
        Self {
            table,
            columns: Vec::new(),
        }
    }

    pub fn set<T: Into<SqlValue>>(mut self, column: &'static str, value: Option<T>) -> Self {
        if let Some(value) = value {
            self.columns.push((column, value.into()));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// `UPDATE <table> SET ..., updated_at = CURRENT_TIMESTAMP WHERE id = $n RETURNING *`,
    /// or `None` when nothing was set.
    pub fn build(self, id: i64) -> Option<Statement> {
        if self.columns.is_empty() {
            return None;
        }

        let mut qb = QueryBuilder::new(format!("UPDATE {} SET ", self.table));
        for (column, value) in self.columns {
            qb.push(column).push(" = ").push_bind(value).push(", ");
        }
        qb.push("updated_at = CURRENT_TIMESTAMP WHERE id = ")
            .push_bind(id)
            .push(" RETURNING *");
        Some(qb.build())
    }
}
