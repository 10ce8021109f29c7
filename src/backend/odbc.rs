use crate::backend::{CellValue, ColumnMeta, DriverCatalog, Query, QueryResult, Session, SqlParam};
use crate::config::{ConnectionTarget, SqlServerAuth};
use crate::error::DashError;
use crate::masking::mask_connection_string;
use odbc_api::buffers::{BufferDesc, ColumnarAnyBuffer};
use odbc_api::parameter::InputParameter;
use odbc_api::{
    ColumnDescription, Connection, ConnectionOptions, Cursor, DataType, Environment,
    IntoParameter, ResultSetMetadata,
};
use once_cell::sync::OnceCell;
use tracing::debug;

const LOGIN_TIMEOUT_SECS: u32 = 30;
const BATCH_SIZE: usize = 5000;
const MAX_TEXT_LEN: usize = 8192;

static ENVIRONMENT: OnceCell<Environment> = OnceCell::new();

fn environment() -> Result<&'static Environment, DashError> {
    ENVIRONMENT.get_or_try_init(|| {
        Environment::new().map_err(|e| DashError::Connection {
            message: format!("ODBC environment error: {}", e),
        })
    })
}

/// Build the ODBC connection string for `driver` against `target`.
pub fn connection_string(driver: &str, target: &ConnectionTarget) -> String {
    let mut parts = vec![
        format!("Driver={{{}}}", driver),
        format!("Server={}", target.server),
        format!("Database={}", target.database),
    ];

    match &target.auth {
        SqlServerAuth::WindowsIntegrated => {
            parts.push("Trusted_Connection=yes".to_string());
        }
        SqlServerAuth::SqlLogin { username, password } => {
            use secrecy::ExposeSecret;
            parts.push(format!("UID={}", username));
            parts.push(format!(
                "PWD={}",
                odbc_api::escape_attribute_value(password.expose_secret())
            ));
        }
    }

    parts.push(format!(
        "TrustServerCertificate={}",
        yes_no(target.trust_server_certificate)
    ));
    parts.push(format!("Encrypt={}", yes_no(target.encrypt)));

    parts.join(";") + ";"
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

/// How a column's text representation is turned back into a scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    Text,
}

/// Map an ODBC column type onto the scalar kind used in results.
pub fn normalize_odbc_type(data_type: &DataType) -> ValueKind {
    match data_type {
        DataType::Bit => ValueKind::Bool,
        DataType::TinyInt | DataType::SmallInt | DataType::Integer | DataType::BigInt => {
            ValueKind::Int
        }
        DataType::Decimal { scale: 0, .. } | DataType::Numeric { scale: 0, .. } => ValueKind::Int,
        DataType::Real
        | DataType::Float { .. }
        | DataType::Double
        | DataType::Decimal { .. }
        | DataType::Numeric { .. } => ValueKind::Float,
        _ => ValueKind::Text,
    }
}

/// Decode a fetched text cell. Values that do not parse as their column kind
/// are kept as text.
pub fn decode_cell(kind: ValueKind, text: &str) -> CellValue {
    match kind {
        ValueKind::Bool => match text.trim() {
            "1" => CellValue::Bool(true),
            "0" => CellValue::Bool(false),
            other => CellValue::Text(other.to_string()),
        },
        ValueKind::Int => text
            .trim()
            .parse()
            .map(CellValue::Int)
            .unwrap_or_else(|_| CellValue::Text(text.to_string())),
        ValueKind::Float => text
            .trim()
            .parse()
            .map(CellValue::Float)
            .unwrap_or_else(|_| CellValue::Text(text.to_string())),
        ValueKind::Text => CellValue::Text(text.to_string()),
    }
}

fn bind_params(params: &[SqlParam]) -> Vec<Box<dyn InputParameter>> {
    params
        .iter()
        .map(|p| -> Box<dyn InputParameter> {
            match p {
                SqlParam::Text(s) => Box::new(s.clone().into_parameter()),
                SqlParam::Int(i) => Box::new(*i),
                SqlParam::Float(f) => Box::new(*f),
            }
        })
        .collect()
}

/// Installed ODBC drivers, reached through the process-wide ODBC environment.
pub struct OdbcCatalog {
    env: &'static Environment,
    show_secrets: bool,
}

impl OdbcCatalog {
    pub fn new(show_secrets: bool) -> Result<Self, DashError> {
        Ok(Self {
            env: environment()?,
            show_secrets,
        })
    }
}

impl DriverCatalog for OdbcCatalog {
    type Session = OdbcSession;

    fn drivers(&self) -> Result<Vec<String>, DashError> {
        let drivers = self.env.drivers().map_err(|e| DashError::Connection {
            message: format!("cannot enumerate ODBC drivers: {}", e),
        })?;
        Ok(drivers.into_iter().map(|d| d.description).collect())
    }

    fn open(&self, driver: &str, target: &ConnectionTarget) -> Result<OdbcSession, DashError> {
        let conn_str = connection_string(driver, target);
        debug!(
            connection = %mask_connection_string(&conn_str, self.show_secrets),
            "opening connection"
        );
        let conn = self
            .env
            .connect_with_connection_string(
                &conn_str,
                ConnectionOptions {
                    login_timeout_sec: Some(LOGIN_TIMEOUT_SECS),
                    ..Default::default()
                },
            )
            .map_err(|e| DashError::Connection {
                message: format!("connection failed with {}: {}", driver, e),
            })?;
        Ok(OdbcSession { conn })
    }
}

pub struct OdbcSession {
    conn: Connection<'static>,
}

impl Session for OdbcSession {
    fn execute(
        &mut self,
        query: &Query,
        timeout_secs: Option<u64>,
    ) -> Result<QueryResult, DashError> {
        let params = bind_params(query.params());
        let cursor = self
            .conn
            .execute(
                query.sql(),
                params.as_slice(),
                timeout_secs.map(|t| t as usize),
            )
            .map_err(|e| DashError::Query {
                message: e.to_string(),
            })?;

        let Some(mut cursor) = cursor else {
            return Ok(QueryResult::empty());
        };

        let num_cols = cursor.num_result_cols().map_err(|e| DashError::Query {
            message: format!("failed to get column count: {}", e),
        })? as usize;

        let mut columns = Vec::with_capacity(num_cols);
        let mut kinds = Vec::with_capacity(num_cols);
        let mut buffer_descs = Vec::with_capacity(num_cols);

        for i in 1..=num_cols as u16 {
            let mut col_desc = ColumnDescription::default();
            cursor
                .describe_col(i, &mut col_desc)
                .map_err(|e| DashError::Query {
                    message: format!("failed to describe column {}: {}", i, e),
                })?;

            let name = col_desc.name_to_string().map_err(|e| DashError::Query {
                message: format!("failed to decode column name {}: {}", i, e),
            })?;

            columns.push(ColumnMeta {
                name,
                type_name: format!("{:?}", col_desc.data_type),
            });
            kinds.push(normalize_odbc_type(&col_desc.data_type));

            // Every column is fetched as text and decoded by kind afterwards.
            let max_str_len = col_desc
                .data_type
                .display_size()
                .map(|n| n.get().saturating_mul(4))
                .unwrap_or(MAX_TEXT_LEN)
                .clamp(1, MAX_TEXT_LEN);
            buffer_descs.push(BufferDesc::Text { max_str_len });
        }

        let buffer = ColumnarAnyBuffer::try_from_descs(BATCH_SIZE, buffer_descs).map_err(|e| {
            DashError::Query {
                message: format!("failed to create buffer: {}", e),
            }
        })?;

        let mut row_set_cursor = cursor.bind_buffer(buffer).map_err(|e| DashError::Query {
            message: format!("failed to bind buffer: {}", e),
        })?;

        let mut rows: Vec<Vec<CellValue>> = Vec::new();

        while let Some(batch) = row_set_cursor.fetch().map_err(|e| DashError::Query {
            message: format!("fetch error: {}", e),
        })? {
            for row_idx in 0..batch.num_rows() {
                let mut row = Vec::with_capacity(num_cols);
                for (col_idx, kind) in kinds.iter().enumerate() {
                    let value = batch
                        .column(col_idx)
                        .as_text_view()
                        .and_then(|view| view.get(row_idx))
                        .map(|bytes| decode_cell(*kind, &String::from_utf8_lossy(bytes)))
                        .unwrap_or(CellValue::Null);
                    row.push(value);
                }
                rows.push(row);
            }
        }

        Ok(QueryResult { columns, rows })
    }
}
