//! Integration smoke test for the infrastructure components.
//!
//! Verifies that PostgreSQL and Redis are reachable with the configured
//! environment. Ignored by default since it needs live services; run with
//! `cargo test -p common -- --ignored` against a local stack.

use common::{
    cache::{RedisConfig, RedisPool},
    database::{DatabaseConfig, health_check, init_pool},
};
use sqlx::Row;

#[tokio::test]
#[ignore = "requires local postgres and redis"]
async fn test_infrastructure_integration() -> Result<(), Box<dyn std::error::Error>> {
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    assert!(health_check(&pool).await?, "Database health check failed");

    let row = sqlx::query("SELECT 1 as result").fetch_one(&pool).await?;
    let result: i32 = row.get("result");
    assert_eq!(result, 1, "PostgreSQL simple query test failed");

    let redis_config = RedisConfig::from_env()?;
    let redis_pool = RedisPool::new(&redis_config).await?;

    assert!(
        redis_pool.health_check().await?,
        "Redis health check failed"
    );

    let test_key = "identity_infra_test_key";
    redis_pool.set(test_key, "test_value", Some(10)).await?;

    let retrieved = redis_pool.get(test_key).await?;
    assert_eq!(retrieved, Some("test_value".to_string()));

    redis_pool.delete(test_key).await?;
    assert_eq!(redis_pool.get(test_key).await?, None);

    Ok(())
}
