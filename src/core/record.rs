//! Record store - generic single-row access to a configuration table.
//!
//! A [`Record`] is a read-only projection of one row of a `SeaORM` entity, bound to
//! the shared database connection. Columns are addressed by name, the way they are
//! spelled in the table, and checked against the entity definition before any
//! statement runs. The only way to change stored data is [`Record::edit`], which
//! writes the named columns in a single `UPDATE` and only then updates the
//! in-memory view.

use crate::errors::{Error, Result};
use sea_orm::sea_query::{self, Alias, Expr, Query, SimpleExpr, TableCreateStatement};
use sea_orm::{
    ColumnTrait, ColumnType, ConnectionTrait, DatabaseConnection, EntityTrait, IdenStatic,
    Iterable, ModelTrait, PrimaryKeyToColumn, QueryFilter, Schema, Value,
};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use tracing::{debug, instrument};

/// SQL storage class of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Text,
}

impl ColumnKind {
    const fn sql(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Text => "TEXT",
        }
    }

    /// The storage class of an entity column type, if the store supports it.
    #[must_use]
    pub const fn of(column_type: &ColumnType) -> Option<Self> {
        match column_type {
            ColumnType::TinyInteger
            | ColumnType::SmallInteger
            | ColumnType::Integer
            | ColumnType::BigInteger => Some(Self::Integer),
            ColumnType::Char(_) | ColumnType::String(_) | ColumnType::Text => Some(Self::Text),
            _ => None,
        }
    }
}

/// A column constraint understood by [`ensure_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    PrimaryKey,
    NotNull,
    Unique,
    Default(i64),
}

/// One column of a table, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub constraints: &'static [Constraint],
}

impl ColumnDef {
    #[must_use]
    pub const fn new(
        name: &'static str,
        kind: ColumnKind,
        constraints: &'static [Constraint],
    ) -> Self {
        Self {
            name,
            kind,
            constraints,
        }
    }

    fn to_statement(self) -> sea_query::ColumnDef {
        let mut column = sea_query::ColumnDef::new(Alias::new(self.name));
        match self.kind {
            ColumnKind::Integer => column.big_integer(),
            ColumnKind::Text => column.text(),
        };
        for constraint in self.constraints {
            match constraint {
                Constraint::PrimaryKey => column.primary_key(),
                Constraint::NotNull => column.not_null(),
                Constraint::Unique => column.unique_key(),
                Constraint::Default(value) => column.default(*value),
            };
        }
        column
    }
}

/// A single column value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Null,
    Integer(i64),
    Text(String),
}

impl FieldValue {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    const fn fits(&self, kind: ColumnKind) -> bool {
        matches!(
            (self, kind),
            (Self::Null, _) | (Self::Integer(_), ColumnKind::Integer) | (Self::Text(_), ColumnKind::Text)
        )
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<FieldValue> for Value {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Null => Self::from(None::<String>),
            FieldValue::Integer(v) => Self::from(v),
            FieldValue::Text(v) => Self::from(v),
        }
    }
}

/// How [`Record::get`] selects its row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Match the primary key.
    Key(FieldValue),
    /// Match every `column = value` pair.
    Filters(Vec<(String, FieldValue)>),
}

impl Lookup {
    pub fn key(value: impl Into<FieldValue>) -> Self {
        Self::Key(value.into())
    }

    pub fn filters<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        Self::Filters(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Creates `name` with the given columns unless it already exists.
///
/// Existing rows are never touched, so this can run on every startup.
#[instrument(skip(db, columns))]
pub async fn ensure_table<C>(db: &C, name: &str, columns: &[ColumnDef]) -> Result<()>
where
    C: ConnectionTrait,
{
    if columns.is_empty() {
        return Err(Error::Validation {
            table: name.to_string(),
            message: "a table needs at least one column".to_string(),
        });
    }

    let mut statement = sea_query::Table::create();
    statement.table(Alias::new(name)).if_not_exists();
    for column in columns {
        statement.col(column.to_statement());
    }
    create_if_absent(db, &statement).await
}

async fn create_if_absent<C>(db: &C, statement: &TableCreateStatement) -> Result<()>
where
    C: ConnectionTrait,
{
    let statement = db.get_database_backend().build(statement);
    debug!("Ensuring table exists: {}", statement);
    db.execute(statement).await?;
    Ok(())
}

/// One row of entity `E`, bound to the connection it was read from or written to.
pub struct Record<E: EntityTrait> {
    db: DatabaseConnection,
    fields: BTreeMap<String, FieldValue>,
    deleted: bool,
    _entity: PhantomData<E>,
}

impl<E: EntityTrait> fmt::Debug for Record<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("table", &Self::table())
            .field("fields", &self.fields)
            .field("deleted", &self.deleted)
            .finish_non_exhaustive()
    }
}

impl<E: EntityTrait> Record<E> {
    /// Creates the entity's table from its definition.
    pub async fn ensure_table(db: &DatabaseConnection) -> Result<()> {
        let mut statement =
            Schema::new(db.get_database_backend()).create_table_from_entity(E::default());
        statement.if_not_exists();
        create_if_absent(db, &statement).await
    }

    /// Inserts a row. `values` must name every column of `E` exactly once.
    #[instrument(skip(db, values), fields(table = %Self::table()))]
    pub async fn create<I, K>(db: &DatabaseConnection, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, FieldValue)>,
        K: AsRef<str>,
    {
        let mut row = BTreeMap::new();
        for (name, value) in values {
            let column = Self::column(name.as_ref())?;
            Self::check_value(column, &value)?;
            let name = column.as_str().to_string();
            if row.contains_key(&name) {
                return Err(Self::invalid(format!("column `{name}` given twice")));
            }
            row.insert(name, value);
        }

        let missing: Vec<_> = E::Column::iter()
            .map(|c| c.as_str().to_string())
            .filter(|name| !row.contains_key(name))
            .collect();
        if !missing.is_empty() {
            return Err(Self::invalid(format!(
                "create needs every column, missing {}",
                missing.join(", ")
            )));
        }

        let values: Vec<SimpleExpr> = E::Column::iter()
            .map(|c| Value::from(row[c.as_str()].clone()).into())
            .collect();
        let mut insert = Query::insert();
        insert
            .into_table(E::default().table_ref())
            .columns(E::Column::iter())
            .values(values)
            .map_err(|e| Self::invalid(e.to_string()))?;

        db.execute(db.get_database_backend().build(&insert)).await?;
        debug!("Inserted {} row {:?}", Self::table(), row);

        Ok(Self::bound(db, row))
    }

    /// Loads exactly one row. Zero matches is [`Error::RecordNotFound`].
    #[instrument(skip(db), fields(table = %Self::table()))]
    pub async fn get(db: &DatabaseConnection, lookup: Lookup) -> Result<Self> {
        let row = Self::fetch(db, &lookup).await?;
        Ok(Self::bound(db, row))
    }

    /// Re-reads this record's row from storage.
    pub async fn refresh(&mut self) -> Result<()> {
        let (_, key) = self.primary_key("refresh")?;
        self.fields = Self::fetch(&self.db, &Lookup::Key(key)).await?;
        Ok(())
    }

    /// Writes `values[i]` into column `keys[i]` in one statement and commits.
    ///
    /// Nothing is sent to storage unless every precondition holds. The primary key
    /// cannot be edited.
    #[instrument(skip(self, values), fields(table = %Self::table()))]
    pub async fn edit(&mut self, keys: &[&str], values: Vec<FieldValue>) -> Result<()> {
        let (key_column, key) = self.primary_key("edit")?;

        if keys.len() != values.len() {
            return Err(Self::invalid(format!(
                "{} column(s) given but {} value(s)",
                keys.len(),
                values.len()
            )));
        }
        if keys.is_empty() {
            return Err(Self::invalid("edit needs at least one column".to_string()));
        }
        let mut seen = HashSet::new();
        if let Some(twice) = keys.iter().find(|name| !seen.insert(**name)) {
            return Err(Self::invalid(format!("column `{twice}` given twice")));
        }

        let mut columns = Vec::with_capacity(keys.len());
        for name in keys {
            columns.push(Self::column(name)?);
        }
        for (column, value) in columns.iter().zip(&values) {
            if column.as_str() == key_column.as_str() {
                return Err(Self::invalid(format!(
                    "primary key `{}` is immutable",
                    key_column.as_str()
                )));
            }
            Self::check_value(*column, value)?;
        }

        let mut update = E::update_many().filter(key_column.eq(key.clone()));
        for (column, value) in columns.iter().zip(&values) {
            update = update.col_expr(*column, Expr::value(Value::from(value.clone())));
        }
        let result = update.exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(Error::RecordNotFound {
                table: Self::table(),
                lookup: format!("{} = {key}", key_column.as_str()),
            });
        }

        for (column, value) in columns.into_iter().zip(values) {
            self.fields.insert(column.as_str().to_string(), value);
        }
        debug!("Edited {} row {}", Self::table(), key);
        Ok(())
    }

    /// Removes the row. The record is unusable afterwards.
    #[instrument(skip(self), fields(table = %Self::table()))]
    pub async fn delete(&mut self) -> Result<()> {
        let (key_column, key) = self.primary_key("delete")?;
        E::delete_many()
            .filter(key_column.eq(key.clone()))
            .exec(&self.db)
            .await?;

        self.deleted = true;
        debug!("Deleted {} row {}", Self::table(), key);
        Ok(())
    }

    /// Reads a column by name.
    pub fn field(&self, name: &str) -> Result<&FieldValue> {
        self.ensure_live()?;
        self.fields.get(name).ok_or_else(|| Error::AttributeNotFound {
            table: Self::table(),
            column: name.to_string(),
        })
    }

    /// A copy of every loaded column.
    pub fn fields(&self) -> Result<BTreeMap<String, FieldValue>> {
        self.ensure_live()?;
        Ok(self.fields.clone())
    }

    /// The shared connection this record is bound to.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Table name of `E`.
    #[must_use]
    pub fn table() -> String {
        E::default().table_name().to_string()
    }

    fn bound(db: &DatabaseConnection, fields: BTreeMap<String, FieldValue>) -> Self {
        Self {
            db: db.clone(),
            fields,
            deleted: false,
            _entity: PhantomData,
        }
    }

    async fn fetch(db: &DatabaseConnection, lookup: &Lookup) -> Result<BTreeMap<String, FieldValue>> {
        let mut query = E::find();
        match lookup {
            Lookup::Key(key) => {
                if key.is_null() {
                    return Err(Self::invalid("primary key lookup with NULL".to_string()));
                }
                query = query.filter(Self::key_column()?.eq(key.clone()));
            }
            Lookup::Filters(filters) => {
                if filters.is_empty() {
                    return Err(Self::invalid("lookup needs at least one filter".to_string()));
                }
                for (name, value) in filters {
                    let column = Self::column(name)?;
                    query = query.filter(if value.is_null() {
                        column.is_null()
                    } else {
                        column.eq(value.clone())
                    });
                }
            }
        }

        let model = query
            .one(db)
            .await?
            .ok_or_else(|| Error::RecordNotFound {
                table: Self::table(),
                lookup: describe(lookup),
            })?;

        E::Column::iter()
            .map(|c| Ok((c.as_str().to_string(), Self::decode(c, model.get(c))?)))
            .collect()
    }

    fn primary_key(&self, operation: &'static str) -> Result<(E::Column, FieldValue)> {
        self.ensure_live()?;
        let column = Self::key_column()?;
        match self.fields.get(column.as_str()) {
            Some(key) if !key.is_null() => Ok((column, key.clone())),
            _ => Err(Error::MissingPrimaryKey {
                table: Self::table(),
                operation,
            }),
        }
    }

    fn key_column() -> Result<E::Column> {
        let mut keys = E::PrimaryKey::iter();
        match (keys.next(), keys.next()) {
            (Some(key), None) => Ok(key.into_column()),
            _ => Err(Self::invalid(
                "records need a single-column primary key".to_string(),
            )),
        }
    }

    fn ensure_live(&self) -> Result<()> {
        if self.deleted {
            return Err(Error::InvalidRecord {
                table: Self::table(),
            });
        }
        Ok(())
    }

    fn column(name: &str) -> Result<E::Column> {
        E::Column::from_str(name).map_err(|_| Error::AttributeNotFound {
            table: Self::table(),
            column: name.to_string(),
        })
    }

    fn kind(column: E::Column) -> Result<ColumnKind> {
        ColumnKind::of(column.def().get_column_type()).ok_or_else(|| {
            Self::invalid(format!("column `{}` has an unsupported type", column.as_str()))
        })
    }

    fn check_value(column: E::Column, value: &FieldValue) -> Result<()> {
        let kind = Self::kind(column)?;
        if value.is_null() && !column.def().is_null() {
            return Err(Self::invalid(format!(
                "column `{}` cannot be NULL",
                column.as_str()
            )));
        }
        if !value.fits(kind) {
            return Err(Self::invalid(format!(
                "column `{}` expects {}, got {value}",
                column.as_str(),
                kind.sql()
            )));
        }
        Ok(())
    }

    fn decode(column: E::Column, value: Value) -> Result<FieldValue> {
        let field = match value {
            Value::TinyInt(v) => FieldValue::from(v.map(i64::from)),
            Value::SmallInt(v) => FieldValue::from(v.map(i64::from)),
            Value::Int(v) => FieldValue::from(v.map(i64::from)),
            Value::BigInt(v) => FieldValue::from(v),
            Value::String(v) => FieldValue::from(v.map(|s| *s)),
            _ => {
                return Err(Self::invalid(format!(
                    "column `{}` has an unsupported type",
                    column.as_str()
                )));
            }
        };
        Ok(field)
    }

    fn invalid(message: String) -> Error {
        Error::Validation {
            table: Self::table(),
            message,
        }
    }
}

fn describe(lookup: &Lookup) -> String {
    match lookup {
        Lookup::Key(key) => format!("key {key}"),
        Lookup::Filters(filters) => filters
            .iter()
            .map(|(k, v)| format!("{k} = {v}"))
            .collect::<Vec<_>>()
            .join(" AND "),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use sea_orm::Database;

    mod notes {
        use sea_orm::entity::prelude::*;

        #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
        #[sea_orm(table_name = "notes")]
        pub struct Model {
            #[sea_orm(primary_key, auto_increment = false)]
            pub id: i64,
            #[sea_orm(column_type = "Text")]
            pub body: Option<String>,
            #[sea_orm(column_type = "Text", unique)]
            pub tag: Option<String>,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }

    type Notes = notes::Entity;

    const NOTE_COLUMNS: &[ColumnDef] = &[
        ColumnDef::new(
            "id",
            ColumnKind::Integer,
            &[Constraint::PrimaryKey, Constraint::NotNull],
        ),
        ColumnDef::new("body", ColumnKind::Text, &[]),
        ColumnDef::new("tag", ColumnKind::Text, &[Constraint::Unique]),
    ];

    async fn setup() -> Result<DatabaseConnection> {
        let db = Database::connect("sqlite::memory:").await?;
        Record::<Notes>::ensure_table(&db).await?;
        Ok(db)
    }

    fn note(id: i64, body: &str, tag: Option<&str>) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("id", id.into()),
            ("body", body.into()),
            ("tag", tag.into()),
        ]
    }

    #[test]
    fn test_column_kinds_of_entity_types() {
        assert_eq!(
            ColumnKind::of(&ColumnType::BigInteger),
            Some(ColumnKind::Integer)
        );
        assert_eq!(ColumnKind::of(&ColumnType::Text), Some(ColumnKind::Text));
        assert_eq!(ColumnKind::of(&ColumnType::Boolean), None);
    }

    #[test]
    fn test_field_value_conversions() {
        assert_eq!(FieldValue::from(Some(5_i64)), FieldValue::Integer(5));
        assert_eq!(FieldValue::from(None::<i64>), FieldValue::Null);
        assert_eq!(FieldValue::from("x").as_text(), Some("x"));
        assert!(FieldValue::Null.fits(ColumnKind::Integer));
        assert!(!FieldValue::Text("x".into()).fits(ColumnKind::Integer));
    }

    #[tokio::test]
    async fn test_ensure_table_rejects_empty_schema() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        let result = ensure_table(&db, "empty", &[]).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_ensure_table_from_column_definitions() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        ensure_table(&db, "notes", NOTE_COLUMNS).await?;
        ensure_table(&db, "notes", NOTE_COLUMNS).await?;

        Record::<Notes>::create(&db, note(1, "a", Some("same"))).await?;
        let dup_tag = Record::<Notes>::create(&db, note(2, "b", Some("same"))).await;
        assert!(matches!(dup_tag, Err(Error::ConstraintViolation { .. })));

        // Re-running the entity schema keeps the existing row.
        Record::<Notes>::ensure_table(&db).await?;
        let loaded = Record::<Notes>::get(&db, Lookup::key(1_i64)).await?;
        assert_eq!(loaded.field("body")?.as_text(), Some("a"));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_requires_every_column() -> Result<()> {
        let db = setup().await?;

        let partial = vec![("id", FieldValue::Integer(1))];
        let result = Record::<Notes>::create(&db, partial).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let unknown = vec![
            ("id", FieldValue::Integer(1)),
            ("body", FieldValue::Null),
            ("tag", FieldValue::Null),
            ("colour", FieldValue::Null),
        ];
        let result = Record::<Notes>::create(&db, unknown).await;
        assert!(matches!(result, Err(Error::AttributeNotFound { .. })));

        let mistyped = vec![
            ("id", FieldValue::Text("one".into())),
            ("body", FieldValue::Null),
            ("tag", FieldValue::Null),
        ];
        let result = Record::<Notes>::create(&db, mistyped).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let null_key = vec![
            ("id", FieldValue::Null),
            ("body", FieldValue::Null),
            ("tag", FieldValue::Null),
        ];
        let result = Record::<Notes>::create(&db, null_key).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        // Nothing reached storage.
        let lookup = Record::<Notes>::get(&db, Lookup::key(1_i64)).await;
        assert!(matches!(lookup, Err(Error::RecordNotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_then_get_roundtrip() -> Result<()> {
        let db = setup().await?;
        let created = Record::<Notes>::create(&db, note(7, "hello", Some("greeting"))).await?;
        let loaded = Record::<Notes>::get(&db, Lookup::key(7_i64)).await?;

        assert_eq!(created.fields()?, loaded.fields()?);
        assert_eq!(loaded.field("body")?.as_text(), Some("hello"));
        Ok(())
    }

    #[tokio::test]
    async fn test_get_by_filters() -> Result<()> {
        let db = setup().await?;
        Record::<Notes>::create(&db, note(1, "a", Some("first"))).await?;
        Record::<Notes>::create(&db, note(2, "b", None)).await?;

        let by_tag = Record::<Notes>::get(&db, Lookup::filters([("tag", "first")])).await?;
        assert_eq!(by_tag.field("id")?.as_integer(), Some(1));

        let by_null = Record::<Notes>::get(&db, Lookup::filters([("tag", FieldValue::Null)])).await?;
        assert_eq!(by_null.field("id")?.as_integer(), Some(2));

        let empty = Record::<Notes>::get(&db, Lookup::Filters(Vec::new())).await;
        assert!(matches!(empty, Err(Error::Validation { .. })));

        let unknown = Record::<Notes>::get(&db, Lookup::filters([("nope", 1_i64)])).await;
        assert!(matches!(unknown, Err(Error::AttributeNotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_filter_values_are_bound_not_interpolated() -> Result<()> {
        let db = setup().await?;
        Record::<Notes>::create(&db, note(1, "a", Some("first"))).await?;

        let result =
            Record::<Notes>::get(&db, Lookup::filters([("tag", "x' OR '1'='1")])).await;
        assert!(matches!(result, Err(Error::RecordNotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_unique_column_is_constraint_violation() -> Result<()> {
        let db = setup().await?;
        Record::<Notes>::create(&db, note(1, "a", Some("same"))).await?;

        let dup_key = Record::<Notes>::create(&db, note(1, "b", None)).await;
        assert!(matches!(dup_key, Err(Error::ConstraintViolation { .. })));

        let dup_tag = Record::<Notes>::create(&db, note(2, "b", Some("same"))).await;
        assert!(matches!(dup_tag, Err(Error::ConstraintViolation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_edit_applies_values_positionally() -> Result<()> {
        let db = setup().await?;
        let mut record = Record::<Notes>::create(&db, note(1, "a", None)).await?;

        record
            .edit(&["tag", "body"], vec!["t".into(), "b".into()])
            .await?;
        assert_eq!(record.field("tag")?.as_text(), Some("t"));
        assert_eq!(record.field("body")?.as_text(), Some("b"));

        let loaded = Record::<Notes>::get(&db, Lookup::key(1_i64)).await?;
        assert_eq!(loaded.fields()?, record.fields()?);
        Ok(())
    }

    #[tokio::test]
    async fn test_edit_validation_happens_before_storage() -> Result<()> {
        let db = setup().await?;
        let mut record = Record::<Notes>::create(&db, note(1, "a", None)).await?;

        let mismatched = record.edit(&["body", "tag"], vec!["x".into()]).await;
        assert!(matches!(mismatched, Err(Error::Validation { .. })));

        let empty = record.edit(&[], Vec::new()).await;
        assert!(matches!(empty, Err(Error::Validation { .. })));

        let primary = record.edit(&["id"], vec![2_i64.into()]).await;
        assert!(matches!(primary, Err(Error::Validation { .. })));

        let twice = record
            .edit(&["body", "body"], vec!["x".into(), "y".into()])
            .await;
        assert!(matches!(twice, Err(Error::Validation { .. })));

        let unknown = record.edit(&["colour"], vec!["red".into()]).await;
        assert!(matches!(unknown, Err(Error::AttributeNotFound { .. })));

        let mistyped = record.edit(&["body"], vec![3_i64.into()]).await;
        assert!(matches!(mistyped, Err(Error::Validation { .. })));

        let loaded = Record::<Notes>::get(&db, Lookup::key(1_i64)).await?;
        assert_eq!(loaded.field("body")?.as_text(), Some("a"));
        Ok(())
    }

    #[tokio::test]
    async fn test_edit_of_vanished_row_is_not_found() -> Result<()> {
        let db = setup().await?;
        let mut first = Record::<Notes>::create(&db, note(1, "a", None)).await?;
        let mut second = Record::<Notes>::get(&db, Lookup::key(1_i64)).await?;

        first.delete().await?;
        let result = second.edit(&["body"], vec!["b".into()]).await;
        assert!(matches!(result, Err(Error::RecordNotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_deleted_record_is_invalid() -> Result<()> {
        let db = setup().await?;
        let mut record = Record::<Notes>::create(&db, note(1, "a", None)).await?;
        record.delete().await?;

        assert!(record.is_deleted());
        assert!(matches!(
            record.edit(&["body"], vec!["b".into()]).await,
            Err(Error::InvalidRecord { .. })
        ));
        assert!(matches!(record.delete().await, Err(Error::InvalidRecord { .. })));
        assert!(matches!(record.refresh().await, Err(Error::InvalidRecord { .. })));
        assert!(matches!(record.field("body"), Err(Error::InvalidRecord { .. })));
        assert!(matches!(record.fields(), Err(Error::InvalidRecord { .. })));

        let lookup = Record::<Notes>::get(&db, Lookup::key(1_i64)).await;
        assert!(matches!(lookup, Err(Error::RecordNotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_refresh_sees_other_writers() -> Result<()> {
        let db = setup().await?;
        let mut reader = Record::<Notes>::create(&db, note(1, "a", None)).await?;
        let mut writer = Record::<Notes>::get(&db, Lookup::key(1_i64)).await?;

        writer.edit(&["body"], vec!["changed".into()]).await?;
        assert_eq!(reader.field("body")?.as_text(), Some("a"));

        reader.refresh().await?;
        assert_eq!(reader.field("body")?.as_text(), Some("changed"));
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_field_read() -> Result<()> {
        let db = setup().await?;
        let record = Record::<Notes>::create(&db, note(1, "a", None)).await?;
        assert!(matches!(
            record.field("colour"),
            Err(Error::AttributeNotFound { .. })
        ));
        assert_eq!(Record::<Notes>::table(), "notes");
        Ok(())
    }
}
