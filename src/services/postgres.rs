use crate::core::{PageRequest, Predicate};
use crate::models::{ColumnValue, Entity, Invitation, Profile, SqlValue};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when interacting with PostgreSQL
#[derive(Debug, Error)]
pub enum PostgresError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),
}

/// PostgreSQL-backed store for every entity
///
/// Reads go through [`Predicate`], so criteria filters and relationship
/// joins are rendered the same way for every entity type.
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, PostgresError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL client from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, PostgresError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }

    /// Client whose pool connects on first use. Nothing is migrated.
    pub fn connect_lazy(database_url: &str) -> Result<Self, PostgresError> {
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_secs(1))
            .connect_lazy(database_url)?;

        Ok(Self { pool })
    }

    /// One page of the entities matching `predicate`.
    ///
    /// Rows are ordered by the requested sort columns, then by id, so paging
    /// is deterministic.
    pub async fn find_by_criteria<E: Entity>(
        &self,
        predicate: &Predicate,
        page: &PageRequest,
    ) -> Result<Vec<E>, PostgresError> {
        let mut qb = select::<E>();
        predicate.push_joins(&mut qb);
        predicate.push_where(&mut qb);
        push_order_by(&mut qb, E::schema().table, page);
        qb.push(" LIMIT ");
        qb.push_bind(i64::from(page.size));
        qb.push(" OFFSET ");
        qb.push_bind(page.offset());

        let rows = qb.build().fetch_all(&self.pool).await?;
        let entities = map_rows(&rows)?;

        tracing::debug!(
            "Found {} {} rows (page {}, size {})",
            entities.len(),
            E::schema().entity,
            page.page,
            page.size
        );

        Ok(entities)
    }

    /// Number of entities matching `predicate`
    pub async fn count_by_criteria<E: Entity>(
        &self,
        predicate: &Predicate,
    ) -> Result<i64, PostgresError> {
        let table = E::schema().table;
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) FROM {table}"));
        predicate.push_joins(&mut qb);
        predicate.push_where(&mut qb);

        let count = qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(count)
    }

    pub async fn find_one<E: Entity>(&self, id: i64) -> Result<Option<E>, PostgresError> {
        let mut qb = select::<E>();
        qb.push(format!(" WHERE {}.id = ", E::schema().table));
        qb.push_bind(id);

        let row = qb.build().fetch_optional(&self.pool).await?;
        row.as_ref().map(E::from_row).transpose().map_err(Into::into)
    }

    /// Insert a new row and read it back with its generated id
    pub async fn insert<E: Entity>(&self, entity: &E) -> Result<E, PostgresError> {
        let table = E::schema().table;
        let columns = entity.columns();
        let names: Vec<&str> = columns.iter().map(|c| c.column).collect();

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "INSERT INTO {table} ({}) VALUES (",
            names.join(", ")
        ));
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            push_column_value(&mut qb, column);
        }
        qb.push(") RETURNING id");

        let id = qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        tracing::debug!("Inserted {} {}", E::schema().entity, id);

        self.find_one(id)
            .await?
            .ok_or(PostgresError::SqlxError(sqlx::Error::RowNotFound))
    }

    /// Overwrite the updatable columns of row `id`. `None` if it does not exist.
    pub async fn update<E: Entity>(&self, id: i64, entity: &E) -> Result<Option<E>, PostgresError> {
        let mut qb = update_query(id, entity);

        let updated = qb
            .build_query_scalar::<i64>()
            .fetch_optional(&self.pool)
            .await?;

        match updated {
            Some(id) => self.find_one(id).await,
            None => Ok(None),
        }
    }

    /// Delete row `id`, returning whether it existed
    pub async fn delete<E: Entity>(&self, id: i64) -> Result<bool, PostgresError> {
        let query = format!("DELETE FROM {} WHERE id = $1", E::schema().table);
        let result = sqlx::query(&query).bind(id).execute(&self.pool).await?;

        Ok(result.rows_affected() > 0)
    }

    /// Every profile in id order, with its location coordinates when linked
    pub async fn list_profiles(&self) -> Result<Vec<Profile>, PostgresError> {
        let mut qb = select::<Profile>();
        qb.push(" ORDER BY profile.id ASC");

        let rows = qb.build().fetch_all(&self.pool).await?;
        map_rows(&rows)
    }

    /// The profile owned by the given account, if any
    pub async fn find_profile_by_user(&self, user_id: i64) -> Result<Option<Profile>, PostgresError> {
        let mut qb = select::<Profile>();
        qb.push(" WHERE profile.user_id = ");
        qb.push_bind(user_id);

        let row = qb.build().fetch_optional(&self.pool).await?;
        row.as_ref().map(Profile::from_row).transpose().map_err(Into::into)
    }

    /// Accepted invitations sent or received by `profile_id`
    pub async fn accepted_invitations(&self, profile_id: i64) -> Result<Vec<Invitation>, PostgresError> {
        let query = r#"
            SELECT invitation.*
            FROM invitation
            WHERE accepted = TRUE
              AND (sent_id = $1 OR received_id = $1)
            ORDER BY id ASC
        "#;

        let rows = sqlx::query(query)
            .bind(profile_id)
            .fetch_all(&self.pool)
            .await?;

        map_rows(&rows)
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<bool, PostgresError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

fn select<E: Entity>() -> QueryBuilder<'static, Postgres> {
    QueryBuilder::new(format!(
        "SELECT {} FROM {}{}",
        E::select_columns(),
        E::schema().table,
        E::base_joins()
    ))
}

fn map_rows<E: Entity>(rows: &[PgRow]) -> Result<Vec<E>, PostgresError> {
    rows.iter()
        .map(E::from_row)
        .collect::<Result<Vec<_>, _>>()
        .map_err(Into::into)
}

fn push_order_by(qb: &mut QueryBuilder<'_, Postgres>, table: &str, page: &PageRequest) {
    qb.push(" ORDER BY ");
    for order in &page.sort {
        qb.push(format!(
            "{table}.{} {}, ",
            order.attribute.column,
            order.direction.as_sql()
        ));
    }
    qb.push(format!("{table}.id ASC"));
}

/// `UPDATE ... SET` over the entity's updatable columns. Insert-only
/// columns such as `created_date` are left untouched.
fn update_query<E: Entity>(id: i64, entity: &E) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::<Postgres>::new(format!("UPDATE {} SET ", E::schema().table));
    for (i, column) in entity.update_columns().iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push(format!("{} = ", column.column));
        push_column_value(&mut qb, column);
    }
    qb.push(" WHERE id = ");
    qb.push_bind(id);
    qb.push(" RETURNING id");
    qb
}

/// Bind a column value. A missing value binds a NULL of the column's type.
fn push_column_value(qb: &mut QueryBuilder<'_, Postgres>, column: &ColumnValue) {
    match &column.value {
        SqlValue::Long(v) => qb.push_bind(*v),
        SqlValue::Double(v) => qb.push_bind(*v),
        SqlValue::Text(v) => qb.push_bind(v.clone()),
        SqlValue::Bool(v) => qb.push_bind(*v),
        SqlValue::Timestamp(v) => qb.push_bind(*v),
        SqlValue::Bytes(v) => qb.push_bind(v.clone()),
    };
}
