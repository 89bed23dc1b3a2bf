//! Guild entity - per-guild bot configuration.
//!
//! One row per guild the bot has seen. Snowflake IDs are stored as SQLite
//! integers.

use sea_orm::entity::prelude::*;

/// Guild configuration model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "guilds")]
pub struct Model {
    /// Discord guild ID
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,
    /// Custom command prefix, None when the guild uses the defaults
    #[sea_orm(column_type = "Text")]
    pub prefix: Option<String>,
    /// Moderation log channel ID
    #[sea_orm(unique)]
    pub mod_log: Option<i64>,
    /// Moderator role ID
    #[sea_orm(unique)]
    pub mod_role: Option<i64>,
    /// Next moderation case number
    #[sea_orm(default_value = 0)]
    pub case_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
