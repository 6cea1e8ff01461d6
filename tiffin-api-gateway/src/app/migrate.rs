use tracing::info;

use crate::config::Config;

pub async fn main(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let applied = tiffin_service::run_migrations(&config.database_url)
        .await
        .map_err(|err| err as Box<dyn std::error::Error>)?;
    for version in &applied {
        info!(%version, "migration applied");
    }
    if applied.is_empty() {
        info!("database schema is up to date");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_database_is_reported() {
        // 1번 포트에는 Postgres가 없으므로 연결 단계에서 실패한다
        let config = Config {
            database_url: "postgres://tiffin@127.0.0.1:1/tiffin".to_string(),
            secret_key: "secret".to_string(),
            port: Config::DEFAULT_PORT,
            cors_origin: None,
            static_dir: None,
        };

        let err = main(config).await.unwrap_err();
        assert!(!err.to_string().is_empty());
    }
}
