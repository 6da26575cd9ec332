use homestead_types::{AppError, CreateFaqRequest, Faq, UpdateFaqRequest};
use sqlx::{Pool, Postgres};

use crate::error_convert::SqlxErrorExt;

const FAQ_COLUMNS: &str =
    "id, dealer_id, category, question, answer, display_order, published, created_at, updated_at";

pub async fn create(
    pool: &Pool<Postgres>,
    dealer_id: &str,
    req: CreateFaqRequest,
) -> Result<Faq, AppError> {
    let sql = format!(
        "INSERT INTO faqs (dealer_id, category, question, answer, display_order, published) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING {FAQ_COLUMNS}"
    );
    let row = sqlx::query_as::<_, Faq>(&sql)
        .bind(dealer_id)
        .bind(&req.category)
        .bind(&req.question)
        .bind(&req.answer)
        .bind(req.display_order)
        .bind(req.published)
        .fetch_one(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(row)
}

/// List FAQ entries, optionally within one category. Unpublished entries
/// are included only for staff.
pub async fn list(
    pool: &Pool<Postgres>,
    dealer_id: &str,
    category: Option<&str>,
    include_unpublished: bool,
) -> Result<Vec<Faq>, AppError> {
    let sql = format!(
        "SELECT {FAQ_COLUMNS} FROM faqs \
         WHERE dealer_id = $1 AND ($2 OR published = true) \
           AND ($3::text IS NULL OR category = $3) \
         ORDER BY category, display_order, id"
    );
    let rows = sqlx::query_as::<_, Faq>(&sql)
        .bind(dealer_id)
        .bind(include_unpublished)
        .bind(category)
        .fetch_all(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(rows)
}

pub async fn update(
    pool: &Pool<Postgres>,
    dealer_id: &str,
    id: i64,
    req: UpdateFaqRequest,
) -> Result<Option<Faq>, AppError> {
    let sql = format!(
        r#"
        UPDATE faqs SET
            category      = COALESCE($3, category),
            question      = COALESCE($4, question),
            answer        = COALESCE($5, answer),
            display_order = COALESCE($6, display_order),
            published     = COALESCE($7, published),
            updated_at    = NOW()
        WHERE id = $1 AND dealer_id = $2
        RETURNING {FAQ_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, Faq>(&sql)
        .bind(id)
        .bind(dealer_id)
        .bind(&req.category)
        .bind(&req.question)
        .bind(&req.answer)
        .bind(req.display_order)
        .bind(req.published)
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(row)
}

pub async fn delete(pool: &Pool<Postgres>, dealer_id: &str, id: i64) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM faqs WHERE id = $1 AND dealer_id = $2")
        .bind(id)
        .bind(dealer_id)
        .execute(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(result.rows_affected() > 0)
}
