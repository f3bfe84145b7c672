//! TypeScript rendering of normalized tables into Sequelize models.
//!
//! Each region renderer returns newline-terminated lines, an empty string
//! when there is nothing to list.

use crate::region::{
    self, Fragments, Region, BOOTSTRAP, COLUMN_DEFS, EXPORT, IMPORT, INTERFACE_ATTRS, MODEL_ATTRS,
};
use crate::schema::{Column, DefaultValue, Table};

/// Extension of every generated file.
pub const EXTENSION: &str = "ts";

const ATTR_INDENT: &str = "  ";
const DEF_INDENT: &str = "        ";
const DEF_FIELD_INDENT: &str = "          ";

pub fn interface_attrs(columns: &[Column]) -> String {
    columns
        .iter()
        .map(|column| {
            let optional = if column.is_required() { "" } else { "?" };
            format!(
                "{ATTR_INDENT}{}{optional}: {};\n",
                column.name, column.value_type
            )
        })
        .collect()
}

pub fn model_attrs(columns: &[Column]) -> String {
    columns
        .iter()
        .map(|column| {
            let assertion = if column.is_required() { "!" } else { "" };
            format!(
                "{ATTR_INDENT}public {}{assertion}: {};\n",
                column.name, column.value_type
            )
        })
        .collect()
}

fn default_literal(default: &DefaultValue) -> &str {
    match default {
        DefaultValue::Now => "NOW",
        DefaultValue::EmptyString => "\"\"",
        DefaultValue::Literal(literal) => literal,
    }
}

fn column_def(column: &Column) -> String {
    let mut out = format!("{DEF_INDENT}{}: {{\n", column.name);
    out.push_str(&format!(
        "{DEF_FIELD_INDENT}type: DataTypes.{},\n",
        column.storage_type
    ));
    if column.auto_increment {
        out.push_str(&format!("{DEF_FIELD_INDENT}autoIncrement: true,\n"));
    }
    if column.primary_key {
        out.push_str(&format!("{DEF_FIELD_INDENT}primaryKey: true,\n"));
    }
    // a primary key already implies NOT NULL
    if !column.primary_key && !column.allow_null {
        out.push_str(&format!("{DEF_FIELD_INDENT}allowNull: false,\n"));
    }
    if let Some(default) = &column.default_value {
        out.push_str(&format!(
            "{DEF_FIELD_INDENT}defaultValue: {},\n",
            default_literal(default)
        ));
    }
    out.push_str(&format!("{DEF_INDENT}}},\n"));

    out
}

pub fn column_defs(columns: &[Column]) -> String {
    columns.iter().map(column_def).collect()
}

pub fn index_imports(tables: &[Table]) -> String {
    tables
        .iter()
        .map(|Table { name, .. }| format!("import {name}, {{ {name}Attributes }} from \"./{name}\";\n"))
        .collect()
}

pub fn index_bootstraps(tables: &[Table]) -> String {
    tables
        .iter()
        .map(|Table { name, .. }| format!("  {name}.bootstrap(sequelize);\n"))
        .collect()
}

pub fn index_exports(tables: &[Table]) -> String {
    tables
        .iter()
        .map(|Table { name, .. }| format!("  {name},\n  {name}Attributes,\n"))
        .collect()
}

fn fragments(items: [(Region, String); 3]) -> Fragments {
    items
        .into_iter()
        .map(|(region, body)| (region.name, body))
        .collect()
}

pub fn index_fragments(tables: &[Table]) -> Fragments {
    fragments([
        (IMPORT, index_imports(tables)),
        (BOOTSTRAP, index_bootstraps(tables)),
        (EXPORT, index_exports(tables)),
    ])
}

pub fn model_fragments(table: &Table) -> Fragments {
    fragments([
        (INTERFACE_ATTRS, interface_attrs(&table.columns)),
        (MODEL_ATTRS, model_attrs(&table.columns)),
        (COLUMN_DEFS, column_defs(&table.columns)),
    ])
}

/// Full `index.ts` for a first run.
pub fn index_file(tables: &[Table]) -> String {
    format!(
        r#"import {{ Sequelize }} from "sequelize";

{imports}

export function load(sequelize: Sequelize) {{
{bootstraps}
}}

export {{
{exports}
}};
"#,
        imports = region::wrap(IMPORT, &index_imports(tables)),
        bootstraps = region::wrap(BOOTSTRAP, &index_bootstraps(tables)),
        exports = region::wrap(EXPORT, &index_exports(tables)),
    )
}

/// Full model file for a table seen for the first time.
pub fn model_file(table: &Table) -> String {
    let name = &table.name;
    format!(
        r#"import {{ Sequelize, Model, DataTypes, NOW }} from "sequelize";

export interface {name}Attributes {{
{interface_attrs}
}}

export default class {name} extends Model<{name}Attributes, Partial<{name}Attributes>> {{
{model_attrs}

  public static bootstrap(sequelize: Sequelize) {{
    {name}.init(
      {{
{column_defs}
      }},
      {{
        sequelize,
        tableName: "{name}",
        timestamps: false,
      }},
    );
  }}
}}
"#,
        interface_attrs = region::wrap(INTERFACE_ATTRS, &interface_attrs(&table.columns)),
        model_attrs = region::wrap(MODEL_ATTRS, &model_attrs(&table.columns)),
        column_defs = region::wrap(COLUMN_DEFS, &column_defs(&table.columns)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::{merge, INDEX_REGIONS, MODEL_REGIONS};
    use crate::types::ValueType;
    use pretty_assertions::assert_eq;

    fn column(name: &str, storage: &str, value: ValueType) -> Column {
        Column {
            name: name.to_string(),
            storage_type: storage.to_string(),
            value_type: value,
            allow_null: true,
            auto_increment: false,
            default_value: None,
            primary_key: false,
        }
    }

    fn users() -> Table {
        Table {
            name: "users".to_string(),
            columns: vec![
                Column {
                    allow_null: true,
                    auto_increment: true,
                    primary_key: true,
                    ..column("id", "INTEGER()", ValueType::Number)
                },
                Column {
                    allow_null: false,
                    ..column("name", "STRING(50)", ValueType::String)
                },
                column("bio", "TEXT()", ValueType::String),
                Column {
                    default_value: Some(DefaultValue::Now),
                    ..column("created_at", "DATE()", ValueType::Date)
                },
            ],
        }
    }

    #[test]
    fn renders_interface_attrs() {
        assert_eq!(
            interface_attrs(&users().columns),
            "  id?: number;\n  name: string;\n  bio?: string;\n  created_at?: Date;\n"
        );
    }

    #[test]
    fn renders_model_attrs() {
        assert_eq!(
            model_attrs(&users().columns),
            "  public id: number;\n  public name!: string;\n  public bio: string;\n  public created_at: Date;\n"
        );
    }

    #[test]
    fn renders_column_defs() {
        let expected = r#"        id: {
          type: DataTypes.INTEGER(),
          autoIncrement: true,
          primaryKey: true,
        },
        name: {
          type: DataTypes.STRING(50),
          allowNull: false,
        },
        bio: {
          type: DataTypes.TEXT(),
        },
        created_at: {
          type: DataTypes.DATE(),
          defaultValue: NOW,
        },
"#;
        assert_eq!(column_defs(&users().columns), expected);
    }

    #[test]
    fn primary_key_never_renders_allow_null() {
        let key = Column {
            allow_null: false,
            primary_key: true,
            ..column("code", "CHAR(3)", ValueType::String)
        };
        assert!(!column_defs(&[key]).contains("allowNull"));
    }

    #[test]
    fn renders_default_literals() {
        let columns = vec![
            Column {
                default_value: Some(DefaultValue::EmptyString),
                ..column("a", "STRING(10)", ValueType::String)
            },
            Column {
                default_value: Some(DefaultValue::Literal("0".into())),
                ..column("b", "INTEGER()", ValueType::Number)
            },
            // literals are emitted as given, even when they aren't valid TypeScript
            Column {
                default_value: Some(DefaultValue::Literal("it's".into())),
                ..column("c", "TEXT()", ValueType::String)
            },
        ];
        let defs = column_defs(&columns);
        assert!(defs.contains("          defaultValue: \"\",\n"));
        assert!(defs.contains("          defaultValue: 0,\n"));
        assert!(defs.contains("          defaultValue: it's,\n"));
    }

    #[test]
    fn renders_index_lines() {
        let tables = vec![
            users(),
            Table {
                name: "posts".into(),
                columns: vec![],
            },
        ];
        assert_eq!(
            index_imports(&tables),
            "import users, { usersAttributes } from \"./users\";\nimport posts, { postsAttributes } from \"./posts\";\n"
        );
        assert_eq!(
            index_bootstraps(&tables),
            "  users.bootstrap(sequelize);\n  posts.bootstrap(sequelize);\n"
        );
        assert_eq!(
            index_exports(&tables),
            "  users,\n  usersAttributes,\n  posts,\n  postsAttributes,\n"
        );
    }

    #[test]
    fn renders_index_file() {
        let expected = r#"import { Sequelize } from "sequelize";

// AutoGenImportBegin {
import users, { usersAttributes } from "./users";
// } AutoGenImportEnd

export function load(sequelize: Sequelize) {
  // AutoGenBootstrapBegin {
  users.bootstrap(sequelize);
  // } AutoGenBootstrapEnd
}

export {
  // AutoGenExportBegin {
  users,
  usersAttributes,
  // } AutoGenExportEnd
};
"#;
        assert_eq!(index_file(&[users()]), expected);
    }

    #[test]
    fn renders_model_file() {
        let table = Table {
            name: "tags".into(),
            columns: vec![Column {
                allow_null: false,
                ..column("label", "STRING(20)", ValueType::String)
            }],
        };
        let expected = r#"import { Sequelize, Model, DataTypes, NOW } from "sequelize";

export interface tagsAttributes {
  // AutoGenIntefaceAttrBegin {
  label: string;
  // } AutoGenIntefaceAttrEnd
}

export default class tags extends Model<tagsAttributes, Partial<tagsAttributes>> {
  // AutoGenModelAttrsBegin {
  public label!: string;
  // } AutoGenModelAttrsEnd

  public static bootstrap(sequelize: Sequelize) {
    tags.init(
      {
        // AutoGenColumnDefsBegin {
        label: {
          type: DataTypes.STRING(20),
          allowNull: false,
        },
        // } AutoGenColumnDefsEnd
      },
      {
        sequelize,
        tableName: "tags",
        timestamps: false,
      },
    );
  }
}
"#;
        assert_eq!(model_file(&table), expected);
    }

    #[test]
    fn merging_into_a_full_render_is_a_no_op() {
        let table = users();
        let full = model_file(&table);
        let merged = merge(&MODEL_REGIONS, &model_fragments(&table), &full).unwrap();
        assert_eq!(merged, full);

        let tables = vec![users()];
        let full = index_file(&tables);
        let merged = merge(&INDEX_REGIONS, &index_fragments(&tables), &full).unwrap();
        assert_eq!(merged, full);
    }

    #[test]
    fn empty_index_still_merges() {
        let full = index_file(&[]);
        assert!(full.contains("// AutoGenImportBegin {\n// } AutoGenImportEnd"));
        let merged = merge(&INDEX_REGIONS, &index_fragments(&[users()]), &full).unwrap();
        assert_eq!(merged, index_file(&[users()]));
    }
}
