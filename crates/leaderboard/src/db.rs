//! SeaORM-backed [`ScoreStore`] for Postgres.

use async_trait::async_trait;
use sea_orm::{
    ActiveValue::Set, ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend,
    DbErr, PaginatorTrait, QueryOrder, QuerySelect, Statement, entity::prelude::*,
    sea_query::OnConflict,
};

use crate::StoreError;
use crate::models::{ActivityRecord, ScoreRecord, Standing};
use crate::store::ScoreStore;
use crate::validate::PlayerName;

pub mod scores {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "scores")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub name: String,
        pub score: i64,
        pub updated_at: DateTimeUtc,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod activity {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "activity")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub name: String,
        pub last_submission_at: DateTimeUtc,
        pub submission_count: i32,
        pub first_seen_at: DateTimeUtc,
        pub session_id: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

/// Connect and return a SeaORM [`DatabaseConnection`].
pub async fn connect(db_url: &str, max_connections: u32) -> Result<DatabaseConnection, DbErr> {
    let mut opts = ConnectOptions::new(db_url.to_owned());
    opts.max_connections(max_connections);
    Database::connect(opts).await
}

pub struct DbStore {
    db: DatabaseConnection,
}

impl DbStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl From<scores::Model> for ScoreRecord {
    fn from(model: scores::Model) -> Self {
        Self {
            name: PlayerName::from_stored(model.name),
            score: model.score,
            updated_at: model.updated_at,
        }
    }
}

impl From<activity::Model> for ActivityRecord {
    fn from(model: activity::Model) -> Self {
        Self {
            name: PlayerName::from_stored(model.name),
            last_submission_at: model.last_submission_at,
            submission_count: model.submission_count,
            first_seen_at: model.first_seen_at,
            session_id: model.session_id,
        }
    }
}

#[async_trait]
impl ScoreStore for DbStore {
    async fn find_score(&self, name: &PlayerName) -> Result<Option<ScoreRecord>, StoreError> {
        let row = scores::Entity::find_by_id(name.as_str().to_owned())
            .one(&self.db)
            .await?;
        Ok(row.map(ScoreRecord::from))
    }

    async fn upsert_score(&self, record: ScoreRecord) -> Result<(), StoreError> {
        let row = scores::ActiveModel {
            name: Set(record.name.as_str().to_owned()),
            score: Set(record.score),
            updated_at: Set(record.updated_at),
        };
        scores::Entity::insert(row)
            .on_conflict(
                OnConflict::column(scores::Column::Name)
                    .update_columns([scores::Column::Score, scores::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn top_scores(&self, limit: u64) -> Result<Vec<ScoreRecord>, StoreError> {
        let rows = scores::Entity::find()
            .order_by_desc(scores::Column::Score)
            .order_by_asc(scores::Column::Name)
            .limit(limit)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(ScoreRecord::from).collect())
    }

    async fn standing(&self, name: &PlayerName) -> Result<Standing, StoreError> {
        let total_players = self.player_count().await?;
        let row = self
            .db
            .query_one(Statement::from_sql_and_values(
                DbBackend::Postgres,
                "SELECT rn FROM (
                     SELECT name, ROW_NUMBER() OVER (ORDER BY score DESC, name ASC) AS rn
                     FROM scores
                 ) ranked WHERE name = $1",
                [name.as_str().into()],
            ))
            .await?;
        let rank = match row {
            Some(row) => Some(row.try_get::<i64>("", "rn").map_err(StoreError::from)? as u64),
            None => None,
        };
        Ok(Standing { rank, total_players })
    }

    async fn player_count(&self) -> Result<u64, StoreError> {
        Ok(scores::Entity::find().count(&self.db).await?)
    }

    async fn find_activity(&self, name: &PlayerName) -> Result<Option<ActivityRecord>, StoreError> {
        let row = activity::Entity::find_by_id(name.as_str().to_owned())
            .one(&self.db)
            .await?;
        Ok(row.map(ActivityRecord::from))
    }

    async fn put_activity(&self, record: ActivityRecord) -> Result<(), StoreError> {
        let row = activity::ActiveModel {
            name: Set(record.name.as_str().to_owned()),
            last_submission_at: Set(record.last_submission_at),
            submission_count: Set(record.submission_count),
            first_seen_at: Set(record.first_seen_at),
            session_id: Set(record.session_id),
        };
        // first_seen_at stays immutable on conflict.
        activity::Entity::insert(row)
            .on_conflict(
                OnConflict::column(activity::Column::Name)
                    .update_columns([
                        activity::Column::LastSubmissionAt,
                        activity::Column::SubmissionCount,
                        activity::Column::SessionId,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await?;
        Ok(())
    }
}
