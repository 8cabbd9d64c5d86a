//! Query definition files
//!
//! Plain SQL bodies separated by a line of ten `#` characters. Any other
//! line starting with `#` is a comment.
//!
//! ```text
//! # requests per status code
//! SELECT request_status_code, COUNT(*) FROM logs GROUP BY 1
//! ##########
//! SELECT COUNT(*) FROM logs
//! ```

use crate::query::error::{QueryError, QueryResult};
use std::path::Path;

/// Line separating two query bodies
pub const QUERY_SEPARATOR: &str = "##########";

/// Split definition text into query bodies, in file order
pub fn parse_definitions(text: &str) -> Vec<String> {
    let mut queries = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed == QUERY_SEPARATOR {
            push_query(&mut queries, &mut current);
        } else if trimmed.starts_with('#') {
            continue;
        } else {
            current.push(' ');
            current.push_str(line);
        }
    }
    push_query(&mut queries, &mut current);

    queries
}

fn push_query(queries: &mut Vec<String>, current: &mut String) {
    let body = current.trim();
    if !body.is_empty() {
        queries.push(body.to_string());
    }
    current.clear();
}

/// Read and split a query definition file
pub fn load_definitions(path: &Path) -> QueryResult<Vec<String>> {
    let text = std::fs::read_to_string(path).map_err(|e| QueryError::Definitions {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;

    let queries = parse_definitions(&text);
    if queries.is_empty() {
        return Err(QueryError::Definitions {
            path: path.to_path_buf(),
            error: "no queries found".to_string(),
        });
    }

    Ok(queries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_definitions() {
        let text = "\
# status codes
SELECT request_status_code, COUNT(*)
FROM logs
GROUP BY 1
##########
# total
SELECT COUNT(*) FROM logs
";
        let queries = parse_definitions(text);
        assert_eq!(
            queries,
            vec![
                "SELECT request_status_code, COUNT(*) FROM logs GROUP BY 1",
                "SELECT COUNT(*) FROM logs",
            ]
        );
    }

    #[test]
    fn test_empty_bodies_skipped() {
        let text = "##########\n\n##########\nSELECT 1\n##########\n";
        assert_eq!(parse_definitions(text), vec!["SELECT 1"]);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let result = load_definitions(&dir.path().join("queries.sql"));
        assert!(matches!(result, Err(QueryError::Definitions { .. })));
    }

    #[test]
    fn test_load_file_without_queries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("queries.sql");
        std::fs::write(&path, "# nothing here\n").unwrap();
        assert!(load_definitions(&path).is_err());
    }
}
