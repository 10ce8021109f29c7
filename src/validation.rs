use sqlparser::ast::{SetExpr, Statement};
use sqlparser::dialect::MsSqlDialect;
use sqlparser::parser::Parser;

/// Why a statement was denied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenialKind {
    WriteStatement,
    SelectInto,
    CteWrappedWrite,
    StoredProcedure,
    ParseFailure,
    Unrecognized,
}

/// A single denial reason.
#[derive(Debug, Clone)]
pub struct DenialReason {
    pub statement_index: usize,
    pub kind: DenialKind,
    pub detail: String,
}

/// Outcome of read-only query validation.
#[derive(Debug)]
pub enum ValidationResult {
    Safe,
    Denied { reasons: Vec<DenialReason> },
}

/// Check that every statement in `sql` only reads, using the T-SQL dialect.
pub fn validate(sql: &str) -> ValidationResult {
    let statements = match Parser::parse_sql(&MsSqlDialect {}, sql) {
        Ok(stmts) => stmts,
        Err(e) => {
            return ValidationResult::Denied {
                reasons: vec![DenialReason {
                    statement_index: 0,
                    kind: DenialKind::ParseFailure,
                    detail: format!("cannot verify query safety: {}", e),
                }],
            };
        }
    };

    let reasons: Vec<DenialReason> = statements
        .iter()
        .enumerate()
        .filter(|(_, stmt)| !is_safe_statement(stmt))
        .map(|(i, stmt)| {
            let (kind, detail) = classify_denial(stmt);
            DenialReason {
                statement_index: i,
                kind,
                detail,
            }
        })
        .collect();

    if reasons.is_empty() {
        ValidationResult::Safe
    } else {
        ValidationResult::Denied { reasons }
    }
}

fn is_safe_statement(stmt: &Statement) -> bool {
    match stmt {
        Statement::Query(query) => is_safe_query_body(&query.body),
        Statement::ExplainTable { .. } | Statement::Explain { .. } => true,
        _ => false,
    }
}

fn is_safe_query_body(body: &SetExpr) -> bool {
    match body {
        SetExpr::Select(select) => select.into.is_none(),
        SetExpr::Query(query) => is_safe_query_body(&query.body),
        SetExpr::SetOperation { left, right, .. } => {
            is_safe_query_body(left) && is_safe_query_body(right)
        }
        SetExpr::Values(_) => true,
        SetExpr::Table(_) => true,
        _ => false,
    }
}

fn classify_denial(stmt: &Statement) -> (DenialKind, String) {
    let write = |what: &str| {
        (
            DenialKind::WriteStatement,
            format!("query would modify state: {}", what),
        )
    };
    match stmt {
        Statement::Insert { .. } => write("INSERT"),
        Statement::Update { .. } => write("UPDATE"),
        Statement::Delete { .. } => write("DELETE"),
        Statement::Drop { .. } => write("DROP"),
        Statement::CreateTable { .. } | Statement::CreateView { .. } => write("DDL"),
        Statement::AlterTable { .. } => write("ALTER"),
        Statement::Truncate { .. } => write("TRUNCATE"),
        Statement::Merge { .. } => write("MERGE"),
        Statement::Execute { .. } => (
            DenialKind::StoredProcedure,
            "stored procedure execution is not allowed in read-only mode".to_string(),
        ),
        Statement::Query(query) => classify_query_denial(&query.body),
        _ => (
            DenialKind::Unrecognized,
            "unrecognized statement type, denied by default".to_string(),
        ),
    }
}

fn classify_query_denial(body: &SetExpr) -> (DenialKind, String) {
    match body {
        SetExpr::Select(select) if select.into.is_some() => (
            DenialKind::SelectInto,
            "SELECT INTO would create a table".to_string(),
        ),
        SetExpr::Insert(_) => (
            DenialKind::CteWrappedWrite,
            "CTE-wrapped INSERT is not allowed in read-only mode".to_string(),
        ),
        SetExpr::Update(_) => (
            DenialKind::CteWrappedWrite,
            "CTE-wrapped UPDATE is not allowed in read-only mode".to_string(),
        ),
        _ => (
            DenialKind::Unrecognized,
            "query contains unsafe operations".to_string(),
        ),
    }
}
