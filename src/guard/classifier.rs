//! SQL statement classification and the keyword deny-list.
//!
//! Uses sqlparser with the generic dialect to identify the statement kind,
//! then scans for a fixed set of forbidden substrings. The substring scan is
//! deliberately coarse: it fires even inside identifiers and string literals,
//! which is an accepted false-positive tradeoff, because it is what catches
//! stacked statements (`SELECT ...; DROP TABLE ...`) that a kind classifier
//! alone would miss.

use sqlparser::ast::Statement;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use super::{StatementKind, Verdict};

/// Substrings that reject a query outright, matched case-insensitively
/// anywhere in the comment-stripped text.
const DENY_LIST: &[&str] = &[
    "drop", "delete", "update", "insert", "create", "alter", "truncate", "exec", "execute", "sp_",
    "xp_",
];

/// Vets a SQL string, returning a verdict without touching any database.
///
/// The checks run in order: comment stripping, empty check, statement-kind
/// classification, read-only check, deny-list scan. The original `sql` text
/// is never altered; callers execute it verbatim once the verdict passes.
pub fn validate(sql: &str) -> Verdict {
    let stripped = strip_comments(sql);

    if stripped.trim().is_empty() {
        return Verdict::rejected("empty query");
    }

    let kinds = match classify(&stripped) {
        Some(kinds) if !kinds.is_empty() => kinds,
        _ => return Verdict::rejected("unrecognized SQL"),
    };

    if let Some(&kind) = kinds.iter().find(|&&k| k != StatementKind::Select) {
        return Verdict::rejected_kind(
            kind,
            format!("only SELECT queries are allowed, found {kind}"),
        );
    }

    let lowered = stripped.to_lowercase();
    for keyword in DENY_LIST {
        if lowered.contains(keyword) {
            return Verdict::rejected(format!("forbidden keyword detected: {keyword}"));
        }
    }

    Verdict::allowed(StatementKind::Select)
}

/// Classifies each statement in the text, or `None` when parsing fails.
fn classify(sql: &str) -> Option<Vec<StatementKind>> {
    let statements = Parser::parse_sql(&GenericDialect {}, sql).ok()?;
    Some(statements.iter().map(classify_statement).collect())
}

fn classify_statement(statement: &Statement) -> StatementKind {
    match statement {
        Statement::Query(_) => StatementKind::Select,
        Statement::Insert(_) => StatementKind::Insert,
        Statement::Update { .. } => StatementKind::Update,
        Statement::Delete(_) => StatementKind::Delete,
        Statement::Drop { .. } => StatementKind::Drop,
        Statement::Truncate { .. } => StatementKind::Truncate,
        Statement::AlterTable { .. }
        | Statement::AlterIndex { .. }
        | Statement::AlterView { .. }
        | Statement::AlterRole { .. } => StatementKind::Alter,
        Statement::CreateTable { .. }
        | Statement::CreateIndex { .. }
        | Statement::CreateView { .. }
        | Statement::CreateSchema { .. }
        | Statement::CreateDatabase { .. }
        | Statement::CreateFunction { .. }
        | Statement::CreateProcedure { .. }
        | Statement::CreateRole { .. }
        | Statement::CreateSequence { .. }
        | Statement::CreateType { .. } => StatementKind::Create,
        Statement::Grant { .. } => StatementKind::Grant,
        Statement::Revoke { .. } => StatementKind::Revoke,
        Statement::Merge { .. } => StatementKind::Merge,
        Statement::Explain { .. } => StatementKind::Explain,
        Statement::ShowVariable { .. }
        | Statement::ShowTables { .. }
        | Statement::ShowColumns { .. }
        | Statement::ShowCreate { .. }
        | Statement::ShowFunctions { .. }
        | Statement::ShowStatus { .. }
        | Statement::ShowCollation { .. } => StatementKind::Show,
        _ => StatementKind::Unknown,
    }
}

/// Strips `-- ...` line comments and `/* ... */` block comments, leaving
/// single-quoted string literals intact.
///
/// Comments are replaced with a single space so adjacent tokens stay
/// separated. Block comments do not nest; an unterminated block comment
/// swallows the rest of the text, which then fails the empty/parse checks.
pub fn strip_comments(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if c == '\'' {
                // '' is an escaped quote inside the literal
                if chars.peek() == Some(&'\'') {
                    out.push('\'');
                    chars.next();
                } else {
                    in_string = false;
                }
            }
            continue;
        }

        match c {
            '\'' => {
                in_string = true;
                out.push(c);
            }
            '-' if chars.peek() == Some(&'-') => {
                chars.next();
                for nc in chars.by_ref() {
                    if nc == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for nc in chars.by_ref() {
                    if prev == '*' && nc == '/' {
                        break;
                    }
                    prev = nc;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn assert_rejected(sql: &str, reason_contains: &str) {
        let verdict = validate(sql);
        assert!(!verdict.is_valid, "expected rejection for: {sql}");
        let reason = verdict.rejection_reason.unwrap();
        assert!(
            reason.contains(reason_contains),
            "SQL: '{sql}' - reason '{reason}' does not mention '{reason_contains}'"
        );
    }

    // Accepted queries

    #[test]
    fn test_select_is_allowed() {
        let verdict = validate("SELECT id, name FROM customers WHERE active = 1");
        assert!(verdict.is_valid);
        assert_eq!(verdict.statement_kind, Some(StatementKind::Select));
    }

    #[test]
    fn test_select_one_is_allowed() {
        assert!(validate("SELECT 1").is_valid);
        assert!(validate("select 1").is_valid);
        assert!(validate("  SeLeCt   1  ").is_valid);
    }

    #[test]
    fn test_select_with_inline_comment_is_allowed() {
        assert!(validate("SELECT /* preview only */ 1").is_valid);
        assert!(validate("SELECT 1 -- trailing note").is_valid);
    }

    #[test]
    fn test_select_with_join_and_aggregate_is_allowed() {
        let sql = "SELECT c.region, COUNT(*) AS n FROM customers c \
                   JOIN orders o ON o.customer_id = c.id GROUP BY c.region";
        assert!(validate(sql).is_valid);
    }

    // Empty / unparseable

    #[test]
    fn test_empty_query_rejected() {
        assert_rejected("", "empty query");
        assert_rejected("   \n\t  ", "empty query");
    }

    #[test]
    fn test_comment_only_query_rejected() {
        assert_rejected("-- just a comment", "empty query");
        assert_rejected("/* nothing here */", "empty query");
    }

    #[test]
    fn test_gibberish_rejected() {
        assert_rejected("THIS IS NOT SQL AT ALL ;;;", "unrecognized SQL");
    }

    // Non-select statement kinds

    #[test]
    fn test_insert_rejected_by_kind() {
        assert_rejected("INSERT INTO t (a) VALUES (1)", "INSERT");
    }

    #[test]
    fn test_update_rejected_by_kind() {
        assert_rejected("UPDATE t SET a = 1", "UPDATE");
    }

    #[test]
    fn test_delete_rejected_by_kind() {
        assert_rejected("DELETE FROM t", "DELETE");
    }

    #[test]
    fn test_drop_rejected_by_kind() {
        let verdict = validate("DROP TABLE users");
        assert!(!verdict.is_valid);
        let reason = verdict.rejection_reason.unwrap().to_lowercase();
        assert!(reason.contains("drop"));
    }

    #[test]
    fn test_truncate_rejected() {
        assert_rejected("TRUNCATE TABLE logs", "TRUNCATE");
    }

    #[test]
    fn test_create_rejected() {
        assert_rejected("CREATE TABLE t (id INT)", "CREATE");
    }

    #[test]
    fn test_explain_rejected() {
        // Only plain SELECT passes; EXPLAIN is still not a read result set.
        assert_rejected("EXPLAIN SELECT 1", "EXPLAIN");
    }

    // Deny-list catches stacked statements after a leading SELECT

    #[test]
    fn test_stacked_drop_rejected() {
        let verdict = validate("SELECT * FROM users; DROP TABLE users");
        assert!(!verdict.is_valid);
        let reason = verdict.rejection_reason.unwrap().to_lowercase();
        assert!(reason.contains("drop"));
    }

    #[test]
    fn test_stacked_delete_rejected() {
        let verdict = validate("SELECT 1; DELETE FROM audit_log");
        assert!(!verdict.is_valid);
    }

    #[test]
    fn test_denylist_matches_inside_identifiers() {
        // Conservative by design: a column named update_count still trips
        // the substring check.
        assert_rejected("SELECT update_count FROM stats", "update");
    }

    #[test]
    fn test_denylist_matches_inside_string_literals() {
        assert_rejected("SELECT * FROM events WHERE action = 'insert'", "insert");
    }

    #[test]
    fn test_denylist_case_insensitive() {
        assert_rejected("SELECT * FROM t WHERE x = 'ExEc me'", "exec");
    }

    #[test]
    fn test_denylist_stored_procedure_prefixes() {
        assert_rejected("SELECT sp_helptext", "sp_");
        assert_rejected("SELECT xp_cmdshell_output FROM t", "xp_");
    }

    #[test]
    fn test_denylist_keyword_in_comment_does_not_reject() {
        // The scan runs on the stripped copy, so commented-out keywords
        // do not fire.
        assert!(validate("SELECT 1 /* do not DROP anything */").is_valid);
        assert!(validate("SELECT 1 -- not a DELETE").is_valid);
    }

    // Comment stripping

    #[test]
    fn test_strip_line_comment() {
        assert_eq!(strip_comments("SELECT 1 -- note"), "SELECT 1 ");
    }

    #[test]
    fn test_strip_line_comment_preserves_newline() {
        assert_eq!(strip_comments("SELECT 1 -- note\nFROM t"), "SELECT 1 \nFROM t");
    }

    #[test]
    fn test_strip_block_comment() {
        assert_eq!(strip_comments("SELECT/*x*/1"), "SELECT 1");
    }

    #[test]
    fn test_strip_preserves_string_literals() {
        assert_eq!(
            strip_comments("SELECT '--not a comment' FROM t"),
            "SELECT '--not a comment' FROM t"
        );
        assert_eq!(
            strip_comments("SELECT '/*still data*/' FROM t"),
            "SELECT '/*still data*/' FROM t"
        );
    }

    #[test]
    fn test_strip_handles_escaped_quote() {
        assert_eq!(
            strip_comments("SELECT 'it''s -- fine' FROM t"),
            "SELECT 'it''s -- fine' FROM t"
        );
    }

    #[test]
    fn test_strip_unterminated_block_comment() {
        assert_eq!(strip_comments("SELECT 1 /* dangling"), "SELECT 1  ");
    }
}
