use futures::future::BoxFuture;
use time::OffsetDateTime;

use crate::animal::{Animal, AnimalFields, Id};
use crate::errors::BackendError;

pub mod local;

/// The operations every animal store offers.
///
/// None of the implementations cache records between calls: each
/// operation reads or writes the underlying store.
pub trait Repository {
    /// Lists every animal, most recently registered first.
    fn list(&self) -> BoxFuture<Result<Vec<Animal>, BackendError>>;

    /// Lists the animals whose `tipo` is exactly `tipo`, in the same order
    /// as `list`.
    fn list_by_type(&self, tipo: &str) -> BoxFuture<Result<Vec<Animal>, BackendError>>;

    fn get_by_id(&self, id: Id) -> BoxFuture<Result<Animal, BackendError>>;

    /// Stores a new animal and returns the ID assigned to it.
    fn insert(&self, fields: AnimalFields) -> BoxFuture<Result<Id, BackendError>>;

    /// Replaces every mutable field of an existing animal. Never creates
    /// a record.
    fn update(&self, id: Id, fields: AnimalFields) -> BoxFuture<Result<(), BackendError>>;

    fn delete(&self, id: Id) -> BoxFuture<Result<(), BackendError>>;

    /// Returns the store's current time.
    fn now(&self) -> BoxFuture<Result<OffsetDateTime, BackendError>>;
}

pub use self::local::LocalRepository;
pub use self::postgres::*;

mod postgres {
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use sqlx::{self, postgres::PgPool};
    use time::OffsetDateTime;

    use crate::animal::{Animal, AnimalFields, Id};
    use crate::errors::BackendError;

    /// An animal store backed by the `animales` table.
    pub struct PgRepository {
        pool: PgPool,
    }

    impl PgRepository {
        pub fn new(pool: PgPool) -> Self {
            PgRepository { pool }
        }

        /// Creates the `animales` table if it does not exist yet.
        pub async fn ensure_schema(&self) -> Result<(), BackendError> {
            sqlx::query(include_str!("queries/schema.sql"))
                .execute(&self.pool)
                .await?;

            Ok(())
        }
    }

    // these can be simplified once async functions in traits are stabilized
    impl super::Repository for PgRepository {
        fn list(&self) -> BoxFuture<Result<Vec<Animal>, BackendError>> {
            async move {
                let query = sqlx::query_as::<_, Animal>(include_str!("queries/list.sql"));

                let animals = query.fetch_all(&self.pool).await?;

                Ok(animals)
            }
            .boxed()
        }

        fn list_by_type(&self, tipo: &str) -> BoxFuture<Result<Vec<Animal>, BackendError>> {
            let tipo = tipo.to_owned();

            async move {
                let query =
                    sqlx::query_as::<_, Animal>(include_str!("queries/list_by_type.sql"));

                let animals = query.bind(tipo).fetch_all(&self.pool).await?;

                Ok(animals)
            }
            .boxed()
        }

        fn get_by_id(&self, id: Id) -> BoxFuture<Result<Animal, BackendError>> {
            async move {
                let query = sqlx::query_as::<_, Animal>(include_str!("queries/retrieve.sql"));

                query
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?
                    .ok_or(BackendError::NonExistentId(id))
            }
            .boxed()
        }

        fn insert(&self, fields: AnimalFields) -> BoxFuture<Result<Id, BackendError>> {
            async move {
                let query = sqlx::query_as(include_str!("queries/create.sql"));

                let (id,): (Id,) = query
                    .bind(fields.nombre)
                    .bind(fields.tipo)
                    .bind(fields.genero)
                    .bind(fields.edad)
                    .bind(fields.region)
                    .bind(fields.descripcion)
                    .bind(fields.imagen)
                    .fetch_one(&self.pool)
                    .await?;

                Ok(id)
            }
            .boxed()
        }

        fn update(&self, id: Id, fields: AnimalFields) -> BoxFuture<Result<(), BackendError>> {
            async move {
                let query = sqlx::query_as::<_, (Id,)>(include_str!("queries/update.sql"));

                query
                    .bind(fields.nombre)
                    .bind(fields.tipo)
                    .bind(fields.genero)
                    .bind(fields.edad)
                    .bind(fields.region)
                    .bind(fields.descripcion)
                    .bind(fields.imagen)
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?
                    .map(|_| ())
                    .ok_or(BackendError::NonExistentId(id))
            }
            .boxed()
        }

        fn delete(&self, id: Id) -> BoxFuture<Result<(), BackendError>> {
            async move {
                let query = sqlx::query_as::<_, (Id,)>(include_str!("queries/delete.sql"));

                query
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?
                    .map(|_| ())
                    .ok_or(BackendError::NonExistentId(id))
            }
            .boxed()
        }

        fn now(&self) -> BoxFuture<Result<OffsetDateTime, BackendError>> {
            async move {
                let query = sqlx::query_as::<_, (OffsetDateTime,)>(include_str!("queries/now.sql"));

                let (now,) = query.fetch_one(&self.pool).await?;

                Ok(now)
            }
            .boxed()
        }
    }
}
