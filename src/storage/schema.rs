//! Relational mapping for the database backend
//!
//! One table per entity kind (except `BaseModel`, which is not mapped) plus
//! the `place_amenity` link table. Every foreign key cascades on delete and
//! is checked at commit, so staged inserts may arrive in any order.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS users (
//!     id TEXT PRIMARY KEY,
//!     created_at TEXT NOT NULL,
//!     updated_at TEXT NOT NULL,
//!     email TEXT NOT NULL,
//!     password TEXT NOT NULL,
//!     first_name TEXT,
//!     last_name TEXT
//! );
//! CREATE TABLE IF NOT EXISTS places (
//!     ...
//!     user_id TEXT NOT NULL REFERENCES users(id)
//!         ON DELETE CASCADE DEFERRABLE INITIALLY DEFERRED,
//!     ...
//! );
//! ```

use crate::models::EntityKind;

// =============================================================================
// Descriptors
// =============================================================================

/// SQLite storage class of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    Real,
}

impl ColumnType {
    #[must_use]
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
        }
    }
}

/// One mapped column. The column name equals the dict key.
#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
    pub nullable: bool,
    /// Parent table this column references (cascade on delete)
    pub references: Option<&'static str>,
}

const fn text(name: &'static str) -> Column {
    Column {
        name,
        ty: ColumnType::Text,
        nullable: true,
        references: None,
    }
}

const fn required(name: &'static str) -> Column {
    Column {
        name,
        ty: ColumnType::Text,
        nullable: false,
        references: None,
    }
}

const fn owner(name: &'static str, table: &'static str) -> Column {
    Column {
        name,
        ty: ColumnType::Text,
        nullable: false,
        references: Some(table),
    }
}

const fn integer(name: &'static str) -> Column {
    Column {
        name,
        ty: ColumnType::Integer,
        nullable: false,
        references: None,
    }
}

const fn real(name: &'static str) -> Column {
    Column {
        name,
        ty: ColumnType::Real,
        nullable: true,
        references: None,
    }
}

/// Columns every table carries.
pub const BASE_COLUMNS: &[Column] = &[
    required("id"),
    required("created_at"),
    required("updated_at"),
];

/// Table backing one entity kind.
#[derive(Debug, Clone, Copy)]
pub struct Table {
    pub kind: EntityKind,
    pub name: &'static str,
    /// Class-specific columns (after `BASE_COLUMNS`)
    pub columns: &'static [Column],
}

impl Table {
    /// Base columns followed by class-specific ones.
    pub fn all_columns(&self) -> impl Iterator<Item = &'static Column> {
        BASE_COLUMNS.iter().chain(self.columns.iter())
    }
}

/// Many-to-many link exposed as a list-of-ids field on the owner.
#[derive(Debug, Clone, Copy)]
pub struct LinkTable {
    pub name: &'static str,
    pub owner: EntityKind,
    /// Dict field on the owner holding the linked ids
    pub field: &'static str,
    pub owner_column: &'static str,
    pub owner_table: &'static str,
    pub target_column: &'static str,
    pub target_table: &'static str,
}

/// Mapped tables, parents before children.
pub const TABLES: &[Table] = &[
    Table {
        kind: EntityKind::User,
        name: "users",
        columns: &[
            required("email"),
            required("password"),
            text("first_name"),
            text("last_name"),
        ],
    },
    Table {
        kind: EntityKind::State,
        name: "states",
        columns: &[required("name")],
    },
    Table {
        kind: EntityKind::City,
        name: "cities",
        columns: &[required("name"), owner("state_id", "states")],
    },
    Table {
        kind: EntityKind::Amenity,
        name: "amenities",
        columns: &[required("name")],
    },
    Table {
        kind: EntityKind::Place,
        name: "places",
        columns: &[
            owner("city_id", "cities"),
            owner("user_id", "users"),
            required("name"),
            text("description"),
            integer("number_rooms"),
            integer("number_bathrooms"),
            integer("max_guest"),
            integer("price_by_night"),
            real("latitude"),
            real("longitude"),
        ],
    },
    Table {
        kind: EntityKind::Review,
        name: "reviews",
        columns: &[
            owner("place_id", "places"),
            owner("user_id", "users"),
            required("text"),
        ],
    },
];

/// Link tables.
pub const LINK_TABLES: &[LinkTable] = &[LinkTable {
    name: "place_amenity",
    owner: EntityKind::Place,
    field: "amenity_ids",
    owner_column: "place_id",
    owner_table: "places",
    target_column: "amenity_id",
    target_table: "amenities",
}];

// =============================================================================
// Lookup
// =============================================================================

/// Table for a kind, `None` for unmapped kinds.
#[must_use]
pub fn table_for(kind: EntityKind) -> Option<&'static Table> {
    TABLES.iter().find(|t| t.kind == kind)
}

/// Table for a class name, `None` for unknown or unmapped classes.
#[must_use]
pub fn table_for_class(cls: &str) -> Option<&'static Table> {
    EntityKind::from_name(cls).and_then(table_for)
}

/// Link tables owned by a kind.
pub fn links_for(kind: EntityKind) -> impl Iterator<Item = &'static LinkTable> {
    LINK_TABLES.iter().filter(move |l| l.owner == kind)
}

// =============================================================================
// DDL
// =============================================================================

fn column_ddl(column: &Column) -> String {
    let mut ddl = format!("{} {}", column.name, column.ty.as_sql());
    if column.name == "id" {
        ddl.push_str(" PRIMARY KEY");
    }
    if !column.nullable {
        ddl.push_str(" NOT NULL");
    }
    if column.ty == ColumnType::Integer && !column.nullable {
        ddl.push_str(" DEFAULT 0");
    }
    if let Some(parent) = column.references {
        ddl.push_str(&format!(
            " REFERENCES {parent}(id) ON DELETE CASCADE DEFERRABLE INITIALLY DEFERRED"
        ));
    }
    ddl
}

/// `CREATE TABLE IF NOT EXISTS` for every table, parents first.
#[must_use]
pub fn create_all_sql() -> String {
    let mut sql = String::new();
    for table in TABLES {
        let columns: Vec<String> = table.all_columns().map(column_ddl).collect();
        sql.push_str(&format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n);\n",
            table.name,
            columns.join(",\n    ")
        ));
    }
    for link in LINK_TABLES {
        sql.push_str(&format!(
            "CREATE TABLE IF NOT EXISTS {name} (\n    \
             {oc} TEXT NOT NULL REFERENCES {ot}(id) ON DELETE CASCADE DEFERRABLE INITIALLY DEFERRED,\n    \
             {tc} TEXT NOT NULL REFERENCES {tt}(id) ON DELETE CASCADE DEFERRABLE INITIALLY DEFERRED,\n    \
             PRIMARY KEY ({oc}, {tc})\n);\n",
            name = link.name,
            oc = link.owner_column,
            ot = link.owner_table,
            tc = link.target_column,
            tt = link.target_table,
        ));
    }
    sql
}

/// `DROP TABLE IF EXISTS` for every table, children first.
#[must_use]
pub fn drop_all_sql() -> String {
    let mut sql = String::new();
    for link in LINK_TABLES {
        sql.push_str(&format!("DROP TABLE IF EXISTS {};\n", link.name));
    }
    for table in TABLES.iter().rev() {
        sql.push_str(&format!("DROP TABLE IF EXISTS {};\n", table.name));
    }
    sql
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_but_base_model_is_mapped() {
        for kind in EntityKind::all() {
            assert_eq!(table_for(*kind).is_some(), *kind != EntityKind::BaseModel);
        }
        assert!(table_for_class("BaseModel").is_none());
        assert!(table_for_class("Nope").is_none());
        assert_eq!(table_for_class("Place").map(|t| t.name), Some("places"));
    }

    #[test]
    fn test_parents_precede_children() {
        let position = |name: &str| TABLES.iter().position(|t| t.name == name).unwrap();
        for table in TABLES {
            for column in table.columns {
                if let Some(parent) = column.references {
                    assert!(position(parent) < position(table.name));
                }
            }
        }
    }

    #[test]
    fn test_column_ddl() {
        assert_eq!(column_ddl(&required("id")), "id TEXT PRIMARY KEY NOT NULL");
        assert_eq!(column_ddl(&text("last_name")), "last_name TEXT");
        assert_eq!(column_ddl(&integer("max_guest")), "max_guest INTEGER NOT NULL DEFAULT 0");
        assert!(column_ddl(&owner("user_id", "users"))
            .ends_with("REFERENCES users(id) ON DELETE CASCADE DEFERRABLE INITIALLY DEFERRED"));
    }

    #[test]
    fn test_create_all_mentions_every_table() {
        let sql = create_all_sql();
        for table in TABLES {
            assert!(sql.contains(&format!("CREATE TABLE IF NOT EXISTS {} (", table.name)));
        }
        assert!(sql.contains("PRIMARY KEY (place_id, amenity_id)"));
    }

    #[test]
    fn test_drop_all_drops_links_first() {
        let sql = drop_all_sql();
        let link = sql.find("place_amenity").unwrap();
        let users = sql.find("DROP TABLE IF EXISTS users").unwrap();
        assert!(link < users);
    }

    #[test]
    fn test_links_for_place() {
        let links: Vec<_> = links_for(EntityKind::Place).map(|l| l.name).collect();
        assert_eq!(links, vec!["place_amenity"]);
        assert_eq!(links_for(EntityKind::User).count(), 0);
    }
}
