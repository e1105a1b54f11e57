use async_trait::async_trait;

use super::storage::{Backend, QueryResult, SqlValue, Statement, StorageError};

/// One engine round trip on canonical SQL, without any RETURNING handling.
#[async_trait]
pub trait RawExecutor: Send + Sync {
    fn backend(&self) -> Backend;

    async fn run(&self, sql: &str, params: &[SqlValue]) -> Result<QueryResult, StorageError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturningPlan {
    pub kind: WriteKind,
    pub table: String,
    pub columns: String,
    pub write_sql: String,
    pub predicate: Option<String>,
}

impl ReturningPlan {
    fn select(&self, columns: &str) -> String {
        match &self.predicate {
            Some(pred) => format!("SELECT {columns} FROM {} WHERE {pred}", self.table),
            None => format!("SELECT {columns} FROM {}", self.table),
        }
    }
}

/// Splits a write carrying a trailing RETURNING clause into the bare write and
/// what is needed to read the affected rows back. Every table keys rows by `id`.
pub fn plan(sql: &str) -> Option<ReturningPlan> {
    let at = find_keyword(sql, "RETURNING")?;
    let columns = sql[at + "RETURNING".len()..]
        .trim()
        .trim_end_matches(';')
        .trim()
        .to_string();
    let write_sql = sql[..at].trim().to_string();

    let words: Vec<&str> = write_sql.split_whitespace().take(3).collect();
    let (kind, table_word) = match words.first()?.to_ascii_uppercase().as_str() {
        "INSERT" => (WriteKind::Insert, words.get(2)?),
        "UPDATE" => (WriteKind::Update, words.get(1)?),
        "DELETE" => (WriteKind::Delete, words.get(2)?),
        _ => return None,
    };
    let table: String = table_word
        .trim_matches(|c| c == '"' || c == '`')
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if table.is_empty() || columns.is_empty() {
        return None;
    }

    let predicate = match kind {
        WriteKind::Insert => None,
        WriteKind::Update | WriteKind::Delete => find_keyword(&write_sql, "WHERE")
            .map(|w| write_sql[w + "WHERE".len()..].trim().to_string()),
    };

    Some(ReturningPlan {
        kind,
        table,
        columns,
        write_sql,
        predicate,
    })
}

/// Runs `stmt`, reconstructing RETURNING rows with follow-up reads when present.
pub async fn execute_emulated<E>(exec: &E, stmt: &Statement) -> Result<QueryResult, StorageError>
where
    E: RawExecutor + ?Sized,
{
    let Some(plan) = plan(&stmt.sql) else {
        return exec.run(&stmt.sql, &stmt.params).await;
    };

    match plan.kind {
        WriteKind::Insert => {
            let result = exec.run(&plan.write_sql, &stmt.params).await?;
            let rows = match result.last_insert_id {
                Some(id) if result.changes.unwrap_or(0) > 0 => {
                    let select = format!("SELECT {} FROM {} WHERE id = $1", plan.columns, plan.table);
                    exec.run(&select, &[SqlValue::Integer(id)]).await?.rows
                }
                _ => Vec::new(),
            };
            Ok(QueryResult {
                rows,
                changes: result.changes,
                last_insert_id: result.last_insert_id,
            })
        }
        WriteKind::Update => {
            // Capture the targets first; the write may change the columns the predicate reads.
            let ids: Vec<i64> = exec
                .run(&plan.select("id"), &stmt.params)
                .await?
                .rows
                .iter()
                .filter_map(|row| row.get("id").and_then(|v| v.as_i64()))
                .collect();
            let result = exec.run(&plan.write_sql, &stmt.params).await?;
            // Matched rows are re-read even when the engine reports zero changed rows
            // (MySQL counts an UPDATE that rewrites identical values as unchanged).
            let rows = if ids.is_empty() {
                Vec::new()
            } else {
                let list = ids.iter().map(i64::to_string).collect::<Vec<_>>().join(", ");
                let select = format!(
                    "SELECT {} FROM {} WHERE id IN ({list}) ORDER BY id",
                    plan.columns, plan.table
                );
                exec.run(&select, &[]).await?.rows
            };
            Ok(QueryResult {
                rows,
                changes: result.changes,
                last_insert_id: None,
            })
        }
        WriteKind::Delete => {
            let rows = exec.run(&plan.select(&plan.columns), &stmt.params).await?.rows;
            let result = exec.run(&plan.write_sql, &stmt.params).await?;
            Ok(QueryResult {
                rows,
                changes: result.changes,
                last_insert_id: None,
            })
        }
    }
}

/// Byte offset of the last `keyword` at paren depth zero outside quotes.
pub(crate) fn find_keyword(sql: &str, keyword: &str) -> Option<usize> {
    let bytes = sql.as_bytes();
    let kw = keyword.as_bytes();
    let mut quote: Option<u8> = None;
    let mut depth = 0i32;
    let mut found = None;

    for i in 0..bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            continue;
        }
        match b {
            b'\'' | b'"' | b'`' => quote = Some(b),
            b'(' => depth += 1,
            b')' => depth -= 1,
            _ if depth == 0 && i + kw.len() <= bytes.len() => {
                let candidate = &bytes[i..i + kw.len()];
                let before_ok = i == 0 || !is_word_byte(bytes[i - 1]);
                let after_ok = i + kw.len() == bytes.len() || !is_word_byte(bytes[i + kw.len()]);
                if before_ok && after_ok && candidate.eq_ignore_ascii_case(kw) {
                    found = Some(i);
                }
            }
            _ => {}
        }
    }
    found
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Whether a statement starts with `INSERT`.
pub(crate) fn is_insert(sql: &str) -> bool {
    sql.trim_start()
        .get(..6)
        .map(|head| head.eq_ignore_ascii_case("INSERT"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_insert() {
        let plan = plan("INSERT INTO bookings (a, b) VALUES ($1, $2) RETURNING *").unwrap();
        assert_eq!(plan.kind, WriteKind::Insert);
        assert_eq!(plan.table, "bookings");
        assert_eq!(plan.columns, "*");
        assert_eq!(plan.write_sql, "INSERT INTO bookings (a, b) VALUES ($1, $2)");
        assert_eq!(plan.predicate, None);
    }

    #[test]
    fn test_plan_update_keeps_predicate() {
        let plan = plan(
            "UPDATE classes SET current_participants = current_participants + 1 \
             WHERE id = $1 AND current_participants < max_participants RETURNING id",
        )
        .unwrap();
        assert_eq!(plan.kind, WriteKind::Update);
        assert_eq!(plan.table, "classes");
        assert_eq!(
            plan.predicate.as_deref(),
            Some("id = $1 AND current_participants < max_participants")
        );
    }

    #[test]
    fn test_plan_delete() {
        let plan = plan("DELETE FROM locations WHERE id = $1 RETURNING *").unwrap();
        assert_eq!(plan.kind, WriteKind::Delete);
        assert_eq!(plan.table, "locations");
        assert_eq!(plan.predicate.as_deref(), Some("id = $1"));
    }

    #[test]
    fn test_no_plan_without_returning() {
        assert!(plan("SELECT * FROM bookings").is_none());
        assert!(plan("UPDATE t SET note = 'returning soon' WHERE id = $1").is_none());
    }

    #[test]
    fn test_where_inside_subquery_is_not_the_predicate() {
        let sql = "UPDATE t SET a = (SELECT b FROM u WHERE u.id = $1) WHERE id = $2";
        let at = find_keyword(sql, "WHERE").unwrap();
        assert_eq!(&sql[at..], "WHERE id = $2");
    }

    #[test]
    fn test_is_insert() {
        assert!(is_insert("  insert into t values (1)"));
        assert!(!is_insert("UPDATE t SET a = 1"));
    }
}
