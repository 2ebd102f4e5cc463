use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    error::AppResult,
    services::catalog::{Catalog, CatalogMovie, CommunityRating},
};

/// Creates a PostgreSQL connection pool and applies pending migrations
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// Loads the movie catalog and community ratings into an in-memory snapshot
pub async fn load_catalog(pool: &PgPool) -> AppResult<Catalog> {
    let movies = sqlx::query_as::<_, CatalogMovie>(
        r#"
        SELECT movie_id, tmdb_id, title
        FROM movies
        ORDER BY movie_id
        "#,
    )
    .fetch_all(pool)
    .await?;

    let ratings = sqlx::query_as::<_, CommunityRating>(
        r#"
        SELECT user_id, movie_id, rating
        FROM ratings
        ORDER BY user_id, movie_id
        "#,
    )
    .fetch_all(pool)
    .await?;

    tracing::info!(
        movies = movies.len(),
        ratings = ratings.len(),
        "Loaded catalog from database"
    );

    Ok(Catalog::new(movies, ratings))
}
