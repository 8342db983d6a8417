//! This file serves as the root for all SeaORM entity modules.
//! The user-management service persists a single entity: the user
//! account record behind the profile endpoints.

pub mod user;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::user::Entity as User;
}

#[cfg(test)]
mod test {
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{
        ActiveModelTrait, ColumnTrait, Database, DatabaseConnection, DbErr, EntityTrait,
        QueryFilter, Set,
    };

    use super::*;
    use prelude::*;

    async fn setup_db() -> Result<DatabaseConnection, DbErr> {
        let db = Database::connect("sqlite::memory:").await?;
        Migrator::up(&db, None).await.expect("Migrations failed.");
        Ok(db)
    }

    #[tokio::test]
    async fn test_user_roundtrip() -> Result<(), DbErr> {
        let db = setup_db().await?;

        let alice = user::ActiveModel {
            username: Set("alice".to_string()),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        user::ActiveModel {
            username: Set("bob".to_string()),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let users = User::find().all(&db).await?;
        assert_eq!(users.len(), 2);

        let found = User::find()
            .filter(user::Column::Username.eq("alice"))
            .one(&db)
            .await?
            .expect("alice should exist");
        assert_eq!(found.id, alice.id);

        Ok(())
    }

    #[tokio::test]
    async fn test_username_is_unique() -> Result<(), DbErr> {
        let db = setup_db().await?;

        user::ActiveModel {
            username: Set("alice".to_string()),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let duplicate = user::ActiveModel {
            username: Set("alice".to_string()),
            ..Default::default()
        }
        .insert(&db)
        .await;

        assert!(duplicate.is_err());
        Ok(())
    }
}
