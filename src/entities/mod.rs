//! Entity module - `SeaORM` entity definitions backing the record store.

pub mod guild;

pub use guild::{Column as GuildColumn, Entity as GuildEntity, Model as GuildModel};
