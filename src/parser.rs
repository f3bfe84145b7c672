//! Reads MySQL DDL into raw tables, replaying `CREATE`, `ALTER` and `DROP`
//! statements in order so the result is the schema as of the end of the file.

use sqlparser::{
    ast::{
        AlterTableOperation, CharacterLength, ColumnDef, ColumnOption, DataType, ExactNumberInfo,
        Expr, ObjectName, ObjectType, Statement, TableConstraint, Value,
    },
    dialect::MySqlDialect,
    keywords::Keyword,
    parser::{Parser, ParserError},
    tokenizer::{Token, TokenWithLocation, Tokenizer},
};
use tracing::debug;

use crate::error::GeneratorError;
use crate::schema::{RawColumn, RawColumnList, RawOptions, RawTable, RawType};

/// MySQL's precision and scale for a bare DECIMAL.
const DEFAULT_DECIMAL: (u64, u64) = (10, 0);

/// Prefix of the custom type names `fold_unsigned` produces.
const UNSIGNED_PREFIX: &str = "UNSIGNED_";

pub fn parse_schema(sql: &str) -> Result<Vec<RawTable>, GeneratorError> {
    let dialect = MySqlDialect {};
    let tokens = Tokenizer::new(&dialect, sql)
        .tokenize_with_location()
        .map_err(ParserError::from)?;
    let ast = Parser::new(&dialect)
        .with_tokens_with_locations(fold_unsigned(tokens))
        .parse_statements()?;
    let mut schema = Schema::default();
    let mut errors = Vec::new();
    for (i, statement) in ast.iter().enumerate() {
        if let Err(err) = schema.process_statement(statement) {
            errors.push(GeneratorError::Statement {
                index: i + 1,
                inner: Box::new(err),
            });
        }
    }

    if let Some(err) = GeneratorError::from_many(errors) {
        return Err(err);
    }

    Ok(schema.tables)
}

#[derive(Default)]
struct Schema {
    tables: Vec<RawTable>,
}

fn is_keyword(token: &Token, keyword: Keyword) -> bool {
    matches!(token, Token::Word(w) if w.keyword == keyword)
}

fn next_significant(tokens: &[TokenWithLocation], from: usize) -> Option<usize> {
    (from..tokens.len()).find(|&i| !matches!(tokens[i].token, Token::Whitespace(_)))
}

/// sqlparser only knows `UNSIGNED` after integer types. MySQL also allows it
/// after DECIMAL, NUMERIC, FLOAT, DOUBLE [PRECISION] and REAL, so those are
/// folded into a custom type name: `DECIMAL(10,2) UNSIGNED` is parsed as
/// `UNSIGNED_DECIMAL(10,2)`.
fn fold_unsigned(mut tokens: Vec<TokenWithLocation>) -> Vec<TokenWithLocation> {
    let mut dropped = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let (keyword, value) = match &tokens[i].token {
            Token::Word(w) => (w.keyword, w.value.to_uppercase()),
            _ => {
                i += 1;
                continue;
            }
        };
        if !matches!(
            keyword,
            Keyword::DECIMAL | Keyword::NUMERIC | Keyword::FLOAT | Keyword::DOUBLE | Keyword::REAL
        ) {
            i += 1;
            continue;
        }

        let mut skipped = Vec::new();
        let mut next = next_significant(&tokens, i + 1);
        if keyword == Keyword::DOUBLE {
            if let Some(j) = next.filter(|&j| is_keyword(&tokens[j].token, Keyword::PRECISION)) {
                skipped.push(j);
                next = next_significant(&tokens, j + 1);
            }
        }
        if let Some(j) = next.filter(|&j| tokens[j].token == Token::LParen) {
            next = (j..tokens.len())
                .find(|&k| tokens[k].token == Token::RParen)
                .and_then(|k| next_significant(&tokens, k + 1));
        }

        match next {
            Some(j) if is_keyword(&tokens[j].token, Keyword::UNSIGNED) => {
                tokens[i].token = Token::make_word(&format!("{UNSIGNED_PREFIX}{value}"), None);
                dropped.extend(skipped);
                dropped.push(j);
                i = j + 1;
            }
            _ => i += 1,
        }
    }

    tokens
        .into_iter()
        .enumerate()
        .filter(|(i, _)| !dropped.contains(i))
        .map(|(_, token)| token)
        .collect()
}

fn object_name(name: &ObjectName) -> String {
    name.0
        .last()
        .map(|ident| ident.value.clone())
        .unwrap_or_default()
}

/// Length of a CHAR/VARCHAR, `None` for `MAX` or no length at all.
fn character_length(length: &Option<CharacterLength>) -> Option<u64> {
    length.as_ref().map(|length| length.length)
}

fn exact_number(info: &ExactNumberInfo) -> (u64, u64) {
    match info {
        ExactNumberInfo::None => DEFAULT_DECIMAL,
        ExactNumberInfo::Precision(digits) => (*digits, 0),
        ExactNumberInfo::PrecisionAndScale(digits, decimals) => (*digits, *decimals),
    }
}

/// Datatype tag for a SQL type, and whether it was declared UNSIGNED.
fn raw_type(data_type: &DataType) -> (RawType, bool) {
    let int = |width| RawType::new("int").width(width);
    match data_type {
        DataType::TinyInt(_) | DataType::Bool | DataType::Boolean => (int(1), false),
        DataType::UnsignedTinyInt(_) => (int(1), true),
        DataType::SmallInt(_) | DataType::Int2(_) => (int(2), false),
        DataType::UnsignedSmallInt(_) | DataType::UnsignedInt2(_) => (int(2), true),
        DataType::MediumInt(_) => (int(3), false),
        DataType::UnsignedMediumInt(_) => (int(3), true),
        DataType::Int(_) | DataType::Integer(_) | DataType::Int4(_) => (int(4), false),
        DataType::UnsignedInt(_) | DataType::UnsignedInteger(_) | DataType::UnsignedInt4(_) => {
            (int(4), true)
        }
        DataType::BigInt(_) | DataType::Int8(_) => (int(8), false),
        DataType::UnsignedBigInt(_) | DataType::UnsignedInt8(_) => (int(8), true),
        DataType::Decimal(info) | DataType::Numeric(info) => {
            let (digits, decimals) = exact_number(info);
            (RawType::new("decimal").digits(digits, decimals), false)
        }
        DataType::Float(_) | DataType::Float4 => (RawType::new("float"), false),
        DataType::Double | DataType::DoublePrecision | DataType::Real | DataType::Float8 => {
            (RawType::new("double"), false)
        }
        DataType::Char(length) | DataType::Character(length) => {
            (with_length("char", character_length(length)), false)
        }
        DataType::Varchar(length)
        | DataType::CharVarying(length)
        | DataType::CharacterVarying(length) => {
            (with_length("varchar", character_length(length)), false)
        }
        DataType::Text => (RawType::new("text"), false),
        DataType::Datetime(_) => (RawType::new("datetime"), false),
        DataType::Date => (RawType::new("date"), false),
        DataType::Timestamp(..) => (RawType::new("timestamp"), false),
        DataType::JSON => (RawType::new("json"), false),
        DataType::Custom(name, modifiers) => custom_type(&object_name(name), modifiers),
        other => (RawType::new(other.to_string().to_lowercase()), false),
    }
}

/// Types sqlparser has no variant for, including the ones `fold_unsigned`
/// renamed.
fn custom_type(name: &str, modifiers: &[String]) -> (RawType, bool) {
    let name = name.to_lowercase();
    let (base, unsigned) = match name.strip_prefix(&UNSIGNED_PREFIX.to_lowercase()) {
        Some(base) => (base, true),
        None => (name.as_str(), false),
    };
    let ty = match base {
        "tinytext" | "mediumtext" | "longtext" => RawType::new("text"),
        "decimal" | "numeric" => {
            let mut numbers = modifiers.iter().map(|m| m.parse::<u64>().ok());
            let digits = numbers.next().flatten().unwrap_or(DEFAULT_DECIMAL.0);
            let decimals = numbers.next().flatten().unwrap_or(DEFAULT_DECIMAL.1);
            RawType::new("decimal").digits(digits, decimals)
        }
        "float" => RawType::new("float"),
        "double" | "real" => RawType::new("double"),
        _ => return (RawType::new(name.as_str()), false),
    };
    (ty, unsigned)
}

fn with_length(datatype: &str, length: Option<u64>) -> RawType {
    match length {
        Some(length) => RawType::new(datatype).length(length),
        None => RawType::new(datatype),
    }
}

/// Default expression in TypeScript lexical form.
fn default_literal(expr: &Expr) -> String {
    match expr {
        Expr::Value(Value::SingleQuotedString(s)) | Expr::Value(Value::DoubleQuotedString(s)) => {
            format!("{s:?}")
        }
        Expr::Value(Value::Null) => "null".to_string(),
        Expr::Value(Value::Boolean(b)) => b.to_string(),
        other => other.to_string(),
    }
}

fn is_auto_increment(option: &ColumnOption) -> bool {
    match option {
        ColumnOption::DialectSpecific(tokens) => tokens
            .iter()
            .any(|token| token.to_string().eq_ignore_ascii_case("AUTO_INCREMENT")),
        _ => false,
    }
}

/// Builds a raw column, returning whether it was declared `PRIMARY KEY` inline.
fn raw_column<'a>(
    name: &str,
    data_type: &DataType,
    column_options: impl IntoIterator<Item = &'a ColumnOption>,
) -> (RawColumn, bool) {
    let (ty, unsigned) = raw_type(data_type);
    let mut options = RawOptions {
        unsigned,
        ..RawOptions::default()
    };
    let mut primary = false;
    for option in column_options {
        match option {
            ColumnOption::NotNull => options.nullable = false,
            ColumnOption::Null => options.nullable = true,
            ColumnOption::Default(expr) => options.default = Some(default_literal(expr)),
            ColumnOption::Unique { is_primary: true, .. } => primary = true,
            other if is_auto_increment(other) => options.autoincrement = true,
            _ => {}
        }
    }

    let column = RawColumn {
        name: name.to_string(),
        ty,
        options,
    };
    (column, primary)
}

fn primary_key_columns(constraint: &TableConstraint) -> Option<Vec<String>> {
    match constraint {
        TableConstraint::Unique {
            columns,
            is_primary: true,
            ..
        } => Some(columns.iter().map(|ident| ident.value.clone()).collect()),
        _ => None,
    }
}

impl RawTable {
    fn add_column(&mut self, column: &ColumnDef) {
        let options = column.options.iter().map(|option| &option.option);
        let (column, primary) = raw_column(&column.name.value, &column.data_type, options);
        if primary {
            self.primary_key.push(column.name.clone());
        }
        self.columns.push(column);
    }

    fn rename_key(&mut self, old: &str, new: &str) {
        for key in &mut self.primary_key {
            if key == old {
                *key = new.to_string();
            }
        }
    }

    fn column_index(&self, name: &str) -> Result<usize, GeneratorError> {
        self.columns
            .iter()
            .position(|column| column.name == name)
            .ok_or_else(|| GeneratorError::ColumnNotExist(name.to_string()))
    }
}

impl Schema {
    fn table_mut(&mut self, name: &str) -> Result<&mut RawTable, GeneratorError> {
        self.tables
            .iter_mut()
            .find(|table| table.name == name)
            .ok_or_else(|| GeneratorError::TableNotExist(name.to_string()))
    }

    fn contains(&self, name: &str) -> bool {
        self.tables.iter().any(|table| table.name == name)
    }

    fn process_statement(&mut self, statement: &Statement) -> Result<(), GeneratorError> {
        match statement {
            Statement::CreateTable {
                name,
                columns,
                constraints,
                if_not_exists,
                ..
            } => {
                let name = object_name(name);
                if self.contains(&name) {
                    if *if_not_exists {
                        debug!(table = %name, "table exists, skipping CREATE TABLE IF NOT EXISTS");
                        return Ok(());
                    }

                    return Err(GeneratorError::DuplicateTable(name));
                }

                let mut table = RawTable {
                    name,
                    columns: RawColumnList::new(),
                    primary_key: Vec::new(),
                };
                for column in columns {
                    table.add_column(column);
                }
                for constraint in constraints {
                    if let Some(keys) = primary_key_columns(constraint) {
                        table.primary_key.extend(keys);
                    }
                }

                debug!(table = %table.name, columns = table.columns.len(), "parsed table");
                self.tables.push(table);
            }
            Statement::AlterTable {
                name, operations, ..
            } => {
                let mut name = object_name(name);
                for op in operations {
                    if let AlterTableOperation::RenameTable { table_name } = op {
                        let new_name = object_name(table_name);
                        if self.contains(&new_name) {
                            return Err(GeneratorError::DuplicateTable(new_name));
                        }

                        self.table_mut(&name)?.name = new_name.clone();
                        name = new_name;
                        continue;
                    }

                    Schema::handle_alter_table_op(self.table_mut(&name)?, op)?;
                }
            }
            Statement::Drop {
                object_type: ObjectType::Table,
                if_exists,
                names,
                ..
            } => {
                for name in names {
                    let name = object_name(name);
                    if !self.contains(&name) {
                        if *if_exists {
                            continue;
                        }

                        return Err(GeneratorError::TableNotExist(name));
                    }

                    self.tables.retain(|table| table.name != name);
                }
            }
            _ => {}
        }

        Ok(())
    }

    fn handle_alter_table_op(
        table: &mut RawTable,
        op: &AlterTableOperation,
    ) -> Result<(), GeneratorError> {
        match op {
            AlterTableOperation::AddColumn { column_def, .. } => table.add_column(column_def),
            AlterTableOperation::RenameColumn {
                old_column_name,
                new_column_name,
            } => {
                let index = table.column_index(&old_column_name.value)?;
                table.rename_key(&old_column_name.value, &new_column_name.value);
                table.columns[index].name = new_column_name.value.clone();
            }
            AlterTableOperation::ChangeColumn {
                old_name,
                new_name,
                data_type,
                options,
                ..
            } => {
                let index = table.column_index(&old_name.value)?;
                let (column, primary) = raw_column(&new_name.value, data_type, options);
                table.rename_key(&old_name.value, &column.name);
                if primary && !table.primary_key.contains(&column.name) {
                    table.primary_key.push(column.name.clone());
                }
                // same position, it is the rendered order
                table.columns[index] = column;
            }
            AlterTableOperation::DropPrimaryKey => table.primary_key.clear(),
            AlterTableOperation::DropColumn { column_name, .. } => {
                let index = table.column_index(&column_name.value)?;
                // keep declaration order, it is the rendered order
                table.columns.remove(index);
                table.primary_key.retain(|key| *key != column_name.value);
            }
            AlterTableOperation::AddConstraint(constraint) => {
                let Some(keys) = primary_key_columns(constraint) else {
                    return Ok(());
                };
                for key in &keys {
                    table.column_index(key)?;
                }
                table.primary_key = keys;
            }
            _ => Err(GeneratorError::Unimplemented(
                "this kind of ALTER TABLE operation",
            ))?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn single(sql: &str) -> RawTable {
        let mut tables = parse_schema(sql).unwrap();
        assert_eq!(tables.len(), 1);
        tables.remove(0)
    }

    #[test]
    fn parses_users_table() {
        let table = single(
            "CREATE TABLE users (id INT AUTO_INCREMENT PRIMARY KEY, name VARCHAR(50) NOT NULL, \
             bio TEXT, created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP)",
        );
        assert_eq!(table.name, "users");
        assert_eq!(table.primary_key, vec!["id".to_string()]);

        let id = &table.columns[0];
        assert_eq!(id.ty, RawType::new("int").width(4));
        assert!(id.options.autoincrement);

        let name = &table.columns[1];
        assert_eq!(name.ty, RawType::new("varchar").length(50));
        assert!(!name.options.nullable);

        let bio = &table.columns[2];
        assert!(bio.options.nullable);
        assert_eq!(bio.options.default, None);

        let created_at = &table.columns[3];
        assert_eq!(created_at.ty, RawType::new("timestamp"));
        assert_eq!(created_at.options.default.as_deref(), Some("CURRENT_TIMESTAMP"));
    }

    #[test]
    fn maps_sql_types_to_tags() {
        let table = single(
            "CREATE TABLE t (a TINYINT, b BIGINT UNSIGNED, c DECIMAL(10,2), d DOUBLE, \
             e CHAR(3), f DATETIME, g DATE, h JSON, i MEDIUMTEXT, j INT UNSIGNED, k BLOB)",
        );
        let tags: Vec<(&str, bool)> = table
            .columns
            .iter()
            .map(|c| (c.ty.datatype.as_str(), c.options.unsigned))
            .collect();
        assert_eq!(
            tags,
            vec![
                ("int", false),
                ("int", true),
                ("decimal", false),
                ("double", false),
                ("char", false),
                ("datetime", false),
                ("date", false),
                ("json", false),
                ("text", false),
                ("int", true),
                ("blob", false),
            ]
        );
        assert_eq!(table.columns[0].ty.width, Some(1));
        assert_eq!(table.columns[1].ty.width, Some(8));
        assert_eq!(table.columns[2].ty, RawType::new("decimal").digits(10, 2));
        assert_eq!(table.columns[4].ty.length, Some(3));
    }

    #[test]
    fn default_literals() {
        let table = single(
            "CREATE TABLE t (a VARCHAR(5) NOT NULL DEFAULT '', b INT DEFAULT 0, \
             c VARCHAR(5) DEFAULT 'x\"y', d INT DEFAULT NULL)",
        );
        let defaults: Vec<Option<&str>> = table
            .columns
            .iter()
            .map(|c| c.options.default.as_deref())
            .collect();
        assert_eq!(
            defaults,
            vec![Some("\"\""), Some("0"), Some("\"x\\\"y\""), Some("null")]
        );
    }

    #[test]
    fn table_level_primary_key() {
        let table = single(
            "CREATE TABLE pairs (a INT NOT NULL, b INT NOT NULL, PRIMARY KEY (a, b)) ENGINE=InnoDB",
        );
        assert_eq!(table.primary_key, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn replays_alter_and_drop() {
        let tables = parse_schema(
            "CREATE TABLE users (id INT NOT NULL, name TEXT);
             CREATE TABLE gone (id INT);
             ALTER TABLE users ADD COLUMN email VARCHAR(100) NOT NULL;
             ALTER TABLE users RENAME COLUMN name TO display_name;
             ALTER TABLE users ADD PRIMARY KEY (id);
             DROP TABLE gone;",
        )
        .unwrap();
        assert_eq!(tables.len(), 1);
        let users = &tables[0];
        let names: Vec<&str> = users.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "display_name", "email"]);
        assert_eq!(users.primary_key, vec!["id".to_string()]);
    }

    #[test]
    fn drop_column_keeps_order() {
        let table = single(
            "CREATE TABLE t (a INT, b INT, c INT, d INT);
             ALTER TABLE t DROP COLUMN b;",
        );
        let names: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c", "d"]);
    }

    #[test]
    fn unknown_tables_are_errors() {
        let err = parse_schema("ALTER TABLE nope ADD COLUMN a INT;").unwrap_err();
        assert!(err.to_string().contains("table 'nope' doesn't exist"), "{err}");

        assert!(parse_schema("DROP TABLE IF EXISTS nope;").unwrap().is_empty());
    }

    #[test]
    fn duplicate_create_table() {
        let sql = "CREATE TABLE t (a INT); CREATE TABLE t (b INT);";
        assert!(parse_schema(sql).is_err());

        let table = single("CREATE TABLE t (a INT); CREATE TABLE IF NOT EXISTS t (b INT);");
        assert_eq!(table.columns[0].name, "a");
    }

    #[test]
    fn syntax_error() {
        let err = parse_schema("CREATE TABLE (").unwrap_err();
        assert!(matches!(err, GeneratorError::Parse(_)));
    }

    #[test]
    fn unsigned_decimal_float_and_double() {
        let table = single(
            "CREATE TABLE prices (price DECIMAL(10,2) UNSIGNED NOT NULL, ratio FLOAT UNSIGNED, \
             total DOUBLE PRECISION UNSIGNED DEFAULT 0, score REAL UNSIGNED, bare DECIMAL UNSIGNED, \
             plain DECIMAL(8,3))",
        );
        let types: Vec<(&RawType, bool)> = table
            .columns
            .iter()
            .map(|c| (&c.ty, c.options.unsigned))
            .collect();
        assert_eq!(
            types,
            vec![
                (&RawType::new("decimal").digits(10, 2), true),
                (&RawType::new("float"), true),
                (&RawType::new("double"), true),
                (&RawType::new("double"), true),
                (&RawType::new("decimal").digits(10, 0), true),
                (&RawType::new("decimal").digits(8, 3), false),
            ]
        );
        assert!(!table.columns[0].options.nullable);
        assert_eq!(table.columns[2].options.default.as_deref(), Some("0"));
    }

    #[test]
    fn unsigned_is_only_folded_after_numeric_types() {
        let table = single("CREATE TABLE t (decimal_places INT UNSIGNED, note TEXT)");
        assert_eq!(table.columns[0].name, "decimal_places");
        assert!(table.columns[0].options.unsigned);
        assert_eq!(table.columns[1].ty, RawType::new("text"));
    }

    #[test]
    fn change_column_replaces_in_place() {
        let table = single(
            "CREATE TABLE t (a INT, b INT, c INT, PRIMARY KEY (b));
             ALTER TABLE t CHANGE COLUMN b renamed BIGINT NOT NULL DEFAULT 7;",
        );
        let names: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "renamed", "c"]);
        assert_eq!(table.primary_key, vec!["renamed".to_string()]);

        let changed = &table.columns[1];
        assert_eq!(changed.ty, RawType::new("int").width(8));
        assert!(!changed.options.nullable);
        assert_eq!(changed.options.default.as_deref(), Some("7"));
    }

    #[test]
    fn rename_table() {
        let tables = parse_schema(
            "CREATE TABLE old_name (id INT);
             ALTER TABLE old_name RENAME TO new_name;
             ALTER TABLE new_name ADD COLUMN extra TEXT;",
        )
        .unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].name, "new_name");
        assert_eq!(tables[0].columns.len(), 2);

        let err = parse_schema(
            "CREATE TABLE a (id INT); CREATE TABLE b (id INT); ALTER TABLE a RENAME TO b;",
        )
        .unwrap_err();
        assert!(err.to_string().contains("table 'b' already exists"), "{err}");
    }

    #[test]
    fn drop_primary_key() {
        let table = single(
            "CREATE TABLE t (id INT PRIMARY KEY, other INT);
             ALTER TABLE t DROP PRIMARY KEY;",
        );
        assert!(table.primary_key.is_empty());
        assert_eq!(table.columns.len(), 2);
    }

    #[test]
    fn unhandled_alter_operation_message() {
        let err = parse_schema(
            "CREATE TABLE t (a INT); ALTER TABLE t ALTER COLUMN a SET DEFAULT 1;",
        )
        .unwrap_err();
        let message = err.to_string();
        assert!(
            message.ends_with(": unimplemented this kind of ALTER TABLE operation"),
            "{message}"
        );
        assert_eq!(message.matches("unimplemented").count(), 1);
    }
}
