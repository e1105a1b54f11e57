use super::storage::{Backend, SqlValue, StorageError};

#[derive(Debug, Clone, PartialEq)]
pub struct Rewritten {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// Translates canonical `$n` placeholders into the engine's native syntax.
///
/// PostgreSQL keeps `$n`, SQLite gets numbered `?n`, MySQL gets bare `?` with the
/// parameter list reordered (and duplicated) to match occurrence order. Text inside
/// string literals and quoted identifiers is left alone.
pub fn rewrite(backend: Backend, sql: &str, params: &[SqlValue]) -> Result<Rewritten, StorageError> {
    let bytes = sql.as_bytes();
    let mut out = String::with_capacity(sql.len() + 8);
    let mut ordered = Vec::new();
    let mut max_index = 0usize;
    let mut quote: Option<u8> = None;
    let mut last = 0usize;
    let mut i = 0usize;

    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            // A doubled quote closes and immediately reopens, which keeps escapes inside.
            if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }

        match b {
            b'\'' | b'"' | b'`' => {
                quote = Some(b);
                i += 1;
            }
            b'$' => {
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && bytes[end].is_ascii_digit() {
                    end += 1;
                }
                if end == start {
                    i += 1;
                    continue;
                }

                let index: usize = sql[start..end].parse().map_err(|_| {
                    StorageError::other(backend, format!("invalid placeholder: {}", &sql[i..end]))
                })?;
                if index == 0 || index > params.len() {
                    return Err(StorageError::other(
                        backend,
                        format!("placeholder ${index} has no bound parameter ({} given)", params.len()),
                    ));
                }

                out.push_str(&sql[last..i]);
                match backend {
                    Backend::Postgres => {
                        out.push('$');
                        out.push_str(&index.to_string());
                    }
                    Backend::Sqlite => {
                        out.push('?');
                        out.push_str(&index.to_string());
                    }
                    Backend::MySql => {
                        out.push('?');
                        ordered.push(params[index - 1].normalized());
                    }
                }
                max_index = max_index.max(index);
                last = end;
                i = end;
            }
            _ => i += 1,
        }
    }
    out.push_str(&sql[last..]);

    let params = match backend {
        Backend::MySql => ordered,
        Backend::Sqlite | Backend::Postgres => params[..max_index]
            .iter()
            .map(SqlValue::normalized)
            .collect(),
    };

    Ok(Rewritten { sql: out, params })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(values: &[&str]) -> Vec<SqlValue> {
        values.iter().map(|v| SqlValue::from(*v)).collect()
    }

    #[test]
    fn test_postgres_keeps_dollar_placeholders() {
        let params = texts(&["a", "b"]);
        let out = rewrite(Backend::Postgres, "SELECT * FROM t WHERE a = $1 AND b = $2", &params).unwrap();
        assert_eq!(out.sql, "SELECT * FROM t WHERE a = $1 AND b = $2");
        assert_eq!(out.params, params);
    }

    #[test]
    fn test_sqlite_uses_numbered_placeholders() {
        let params = texts(&["a", "b"]);
        let out = rewrite(Backend::Sqlite, "UPDATE t SET a = $1 WHERE id = $2", &params).unwrap();
        assert_eq!(out.sql, "UPDATE t SET a = ?1 WHERE id = ?2");
        assert_eq!(out.params.len(), 2);
    }

    #[test]
    fn test_mysql_reorders_and_duplicates_params() {
        let params = texts(&["first", "second"]);
        let out = rewrite(Backend::MySql, "SELECT $2, $1, $2", &params).unwrap();
        assert_eq!(out.sql, "SELECT ?, ?, ?");
        assert_eq!(out.params, texts(&["second", "first", "second"]));
    }

    #[test]
    fn test_placeholders_inside_literals_are_ignored() {
        let params = texts(&["x"]);
        let out = rewrite(Backend::MySql, "SELECT '$1 it''s', \"$2\" FROM t WHERE a = $1", &params).unwrap();
        assert_eq!(out.sql, "SELECT '$1 it''s', \"$2\" FROM t WHERE a = ?");
        assert_eq!(out.params, texts(&["x"]));
    }

    #[test]
    fn test_params_truncated_to_highest_index_used() {
        let params = texts(&["a", "b", "c"]);
        let out = rewrite(Backend::Sqlite, "SELECT id FROM t WHERE id = $2", &params).unwrap();
        assert_eq!(out.sql, "SELECT id FROM t WHERE id = ?2");
        assert_eq!(out.params, texts(&["a", "b"]));
    }

    #[test]
    fn test_missing_parameter_is_an_error() {
        let err = rewrite(Backend::Postgres, "SELECT $3", &texts(&["a"])).unwrap_err();
        assert!(err.message.contains("$3"));
    }

    #[test]
    fn test_booleans_are_bound_as_integers() {
        let out = rewrite(Backend::Postgres, "SELECT $1", &[SqlValue::Bool(true)]).unwrap();
        assert_eq!(out.params, vec![SqlValue::Integer(1)]);
    }
}
