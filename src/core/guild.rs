//! Guild business logic - typed access to the `guilds` record.
//!
//! [`Guild`] wraps the generic [`Record`] for the `guilds` table with typed accessors
//! and the handful of writes the bot performs (prefix changes, join/leave lifecycle).

use crate::{
    core::record::{FieldValue, Lookup, Record},
    entities::{GuildColumn, GuildEntity},
    errors::{Error, Result},
};
use sea_orm::{DatabaseConnection, IdenStatic};
use tracing::{debug, info, instrument};

/// Values for a guild row that does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGuild {
    pub id: u64,
    pub prefix: Option<String>,
    pub mod_log: Option<u64>,
    pub mod_role: Option<u64>,
    pub case_id: i64,
}

impl NewGuild {
    /// A guild with no overrides and the case counter at zero.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self {
            id,
            prefix: None,
            mod_log: None,
            mod_role: None,
            case_id: 0,
        }
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    fn into_fields(self) -> Result<Vec<(&'static str, FieldValue)>> {
        Ok(vec![
            (GuildColumn::Id.as_str(), to_db_id(self.id)?.into()),
            (GuildColumn::Prefix.as_str(), self.prefix.into()),
            (
                GuildColumn::ModLog.as_str(),
                self.mod_log.map(to_db_id).transpose()?.into(),
            ),
            (
                GuildColumn::ModRole.as_str(),
                self.mod_role.map(to_db_id).transpose()?.into(),
            ),
            (GuildColumn::CaseId.as_str(), self.case_id.into()),
        ])
    }
}

/// Converts a Discord snowflake to the integer stored in SQLite.
pub fn to_db_id(id: u64) -> Result<i64> {
    i64::try_from(id).map_err(|_| Error::Validation {
        table: Record::<GuildEntity>::table(),
        message: format!("ID {id} does not fit in a SQLite integer"),
    })
}

fn from_db_id(value: &FieldValue) -> Option<u64> {
    value.as_integer().and_then(|v| u64::try_from(v).ok())
}

/// Per-guild configuration, loaded from or written to the `guilds` table.
#[derive(Debug)]
pub struct Guild {
    record: Record<GuildEntity>,
}

impl Guild {
    /// Creates the `guilds` table if it is missing.
    pub async fn ensure_table(db: &DatabaseConnection) -> Result<()> {
        Record::<GuildEntity>::ensure_table(db).await
    }

    /// Inserts a new guild row.
    ///
    /// A duplicate `id`, `mod_log` or `mod_role` is [`Error::ConstraintViolation`].
    pub async fn create(db: &DatabaseConnection, guild: NewGuild) -> Result<Self> {
        Self::create_from(db, guild.into_fields()?).await
    }

    /// Inserts a guild row from raw column values. Every column must be present.
    pub async fn create_from<I, K>(db: &DatabaseConnection, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, FieldValue)>,
        K: AsRef<str>,
    {
        let record = Record::create(db, values).await?;
        Ok(Self { record })
    }

    /// Loads a guild by ID.
    pub async fn get(db: &DatabaseConnection, id: u64) -> Result<Self> {
        let record = Record::get(db, Lookup::key(to_db_id(id)?)).await?;
        Ok(Self { record })
    }

    /// Loads the first guild matching every `column = value` filter.
    pub async fn find<I, K, V>(db: &DatabaseConnection, filters: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        let record = Record::get(db, Lookup::filters(filters)).await?;
        Ok(Self { record })
    }

    /// Loads a guild, creating a default row the first time it is seen.
    #[instrument(skip(db))]
    pub async fn get_or_create(db: &DatabaseConnection, id: u64) -> Result<Self> {
        match Self::get(db, id).await {
            Err(e) if e.is_not_found() => {}
            other => return other,
        }

        match Self::create(db, NewGuild::new(id)).await {
            Ok(guild) => {
                info!("Created configuration record for guild {}", id);
                Ok(guild)
            }
            // Another task inserted the row between our read and our write.
            Err(Error::ConstraintViolation { .. }) => {
                debug!("Guild {} was created concurrently, reloading", id);
                Self::get(db, id).await
            }
            Err(e) => Err(e),
        }
    }

    /// Guild ID.
    pub fn id(&self) -> Result<u64> {
        Ok(from_db_id(self.field(GuildColumn::Id.as_str())?).unwrap_or_default())
    }

    /// Custom command prefix, if the guild set one.
    pub fn prefix(&self) -> Result<Option<&str>> {
        Ok(self.field(GuildColumn::Prefix.as_str())?.as_text())
    }

    /// Moderation log channel.
    pub fn mod_log(&self) -> Result<Option<u64>> {
        Ok(from_db_id(self.field(GuildColumn::ModLog.as_str())?))
    }

    /// Moderator role.
    pub fn mod_role(&self) -> Result<Option<u64>> {
        Ok(from_db_id(self.field(GuildColumn::ModRole.as_str())?))
    }

    /// Next moderation case number.
    pub fn case_id(&self) -> Result<i64> {
        Ok(self
            .field(GuildColumn::CaseId.as_str())?
            .as_integer()
            .unwrap_or_default())
    }

    /// Reads a column by name.
    pub fn field(&self, name: &str) -> Result<&FieldValue> {
        self.record.field(name)
    }

    /// Writes the given columns in one statement. See [`Record::edit`].
    pub async fn edit(&mut self, keys: &[&str], values: Vec<FieldValue>) -> Result<()> {
        self.record.edit(keys, values).await
    }

    /// Sets or clears the custom prefix.
    pub async fn set_prefix(&mut self, prefix: Option<String>) -> Result<()> {
        self.edit(&[GuildColumn::Prefix.as_str()], vec![prefix.into()])
            .await
    }

    /// Re-reads the row from storage.
    pub async fn refresh(&mut self) -> Result<()> {
        self.record.refresh().await
    }

    /// Deletes the row. The instance is unusable afterwards.
    pub async fn delete(&mut self) -> Result<()> {
        self.record.delete().await
    }

    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.record.is_deleted()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_to_db_id_rejects_out_of_range() {
        assert_eq!(to_db_id(42).unwrap(), 42);
        assert!(matches!(to_db_id(u64::MAX), Err(Error::Validation { .. })));
    }

    #[tokio::test]
    async fn test_create_then_get_returns_identical_values() -> Result<()> {
        let db = setup_test_db().await?;
        let new = NewGuild {
            id: 100,
            prefix: Some("//".to_string()),
            mod_log: Some(555),
            mod_role: Some(777),
            case_id: 3,
        };

        let created = Guild::create(&db, new).await?;
        let loaded = Guild::get(&db, 100).await?;

        assert_eq!(created.id()?, loaded.id()?);
        assert_eq!(loaded.prefix()?, Some("//"));
        assert_eq!(loaded.mod_log()?, Some(555));
        assert_eq!(loaded.mod_role()?, Some(777));
        assert_eq!(loaded.case_id()?, 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_get_missing_guild_is_not_found() -> Result<()> {
        let db = setup_test_db().await?;
        let result = Guild::get(&db, 404).await;
        assert!(matches!(result, Err(Error::RecordNotFound { ref table, .. }) if table == "guilds"));
        Ok(())
    }

    #[tokio::test]
    async fn test_edit_prefix_changes_only_prefix() -> Result<()> {
        let db = setup_test_db().await?;
        let mut guild = Guild::create(
            &db,
            NewGuild {
                mod_log: Some(9),
                ..NewGuild::new(100)
            },
        )
        .await?;

        guild.edit(&["prefix"], vec!["!".into()]).await?;

        let loaded = Guild::get(&db, 100).await?;
        assert_eq!(loaded.prefix()?, Some("!"));
        assert_eq!(loaded.mod_log()?, Some(9));
        assert_eq!(loaded.mod_role()?, None);
        assert_eq!(loaded.case_id()?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_set_prefix_and_clear() -> Result<()> {
        let db = setup_test_db().await?;
        let mut guild = create_test_guild(&db, 1).await?;

        guild.set_prefix(Some("?".to_string())).await?;
        assert_eq!(guild.prefix()?, Some("?"));

        guild.set_prefix(None).await?;
        assert_eq!(Guild::get(&db, 1).await?.prefix()?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_guild_or_mod_log_is_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        Guild::create(
            &db,
            NewGuild {
                mod_log: Some(10),
                ..NewGuild::new(1)
            },
        )
        .await?;

        let same_id = Guild::create(&db, NewGuild::new(1)).await;
        assert!(matches!(same_id, Err(Error::ConstraintViolation { .. })));

        let same_log = Guild::create(
            &db,
            NewGuild {
                mod_log: Some(10),
                ..NewGuild::new(2)
            },
        )
        .await;
        assert!(matches!(same_log, Err(Error::ConstraintViolation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_find_by_mod_role() -> Result<()> {
        let db = setup_test_db().await?;
        Guild::create(
            &db,
            NewGuild {
                mod_role: Some(88),
                ..NewGuild::new(5)
            },
        )
        .await?;

        let found = Guild::find(&db, [(GuildColumn::ModRole.as_str(), 88_i64)]).await?;
        assert_eq!(found.id()?, 5);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_from_untyped_fields() -> Result<()> {
        let db = setup_test_db().await?;
        let fields = vec![
            ("id", FieldValue::Integer(12)),
            ("prefix", FieldValue::Text(">>".into())),
            ("mod_log", FieldValue::Null),
            ("mod_role", FieldValue::Null),
            ("case_id", FieldValue::Integer(0)),
        ];
        let guild = Guild::create_from(&db, fields).await?;
        assert_eq!(guild.prefix()?, Some(">>"));

        let partial = vec![("id", FieldValue::Integer(13))];
        let result = Guild::create_from(&db, partial).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let null_case = vec![
            ("id", FieldValue::Integer(14)),
            ("prefix", FieldValue::Null),
            ("mod_log", FieldValue::Null),
            ("mod_role", FieldValue::Null),
            ("case_id", FieldValue::Null),
        ];
        let result = Guild::create_from(&db, null_case).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;

        let first = Guild::get_or_create(&db, 7).await?;
        assert_eq!(first.id()?, 7);
        assert_eq!(first.prefix()?, None);

        let mut existing = Guild::get(&db, 7).await?;
        existing.set_prefix(Some("$".to_string())).await?;

        let second = Guild::get_or_create(&db, 7).await?;
        assert_eq!(second.prefix()?, Some("$"));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_invalidates_instance() -> Result<()> {
        let db = setup_test_db().await?;
        let mut guild = create_test_guild(&db, 100).await?;
        guild.delete().await?;

        assert!(guild.is_deleted());
        assert!(matches!(
            guild.set_prefix(Some("!".to_string())).await,
            Err(Error::InvalidRecord { .. })
        ));
        assert!(matches!(guild.delete().await, Err(Error::InvalidRecord { .. })));
        assert!(matches!(guild.refresh().await, Err(Error::InvalidRecord { .. })));
        assert!(Guild::get(&db, 100).await.unwrap_err().is_not_found());
        Ok(())
    }

    #[tokio::test]
    async fn test_accessors_fail_after_delete() -> Result<()> {
        let db = setup_test_db().await?;
        let mut guild = create_guild_with_prefix(&db, 100, "!").await?;
        assert_eq!(guild.prefix()?, Some("!"));

        guild.delete().await?;

        assert!(matches!(guild.id(), Err(Error::InvalidRecord { .. })));
        assert!(matches!(guild.prefix(), Err(Error::InvalidRecord { .. })));
        assert!(matches!(guild.mod_log(), Err(Error::InvalidRecord { .. })));
        assert!(matches!(guild.mod_role(), Err(Error::InvalidRecord { .. })));
        assert!(matches!(guild.case_id(), Err(Error::InvalidRecord { .. })));
        assert!(matches!(guild.field("prefix"), Err(Error::InvalidRecord { .. })));
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_edits_leave_one_value() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let db = crate::config::database::init_db(&dir.path().join("main.db")).await?;
        create_test_guild(&db, 100).await?;

        let tasks: Vec<_> = (0..32_i64)
            .map(|i| {
                let db = db.clone();
                tokio::spawn(async move {
                    let mut guild = Guild::get(&db, 100).await?;
                    guild
                        .edit(
                            &["prefix", "case_id"],
                            vec![format!("p{i}").into(), i.into()],
                        )
                        .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap()?;
        }

        let loaded = Guild::get(&db, 100).await?;
        let prefix = loaded.prefix()?.unwrap();
        assert_eq!(prefix, format!("p{}", loaded.case_id()?));
        Ok(())
    }
}
