use sqlx::PgPool;
use uuid::Uuid;

use crate::models::CallerRow;

pub const SQL_LOAD_CALLER: &str = r#"
SELECT
    uuid,
    ST_X(location) AS longitude,
    ST_Y(location) AS latitude
FROM users
WHERE uuid = $1
  AND is_active
  AND deleted_at IS NULL
LIMIT 1
"#;

pub async fn load_caller(pool: &PgPool, user_uuid: Uuid) -> sqlx::Result<Option<CallerRow>> {
    sqlx::query_as::<_, CallerRow>(SQL_LOAD_CALLER)
        .bind(user_uuid)
        .fetch_optional(pool)
        .await
}
