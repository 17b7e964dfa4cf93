use std::io;

use comanda_service::{build_server, create_pool, run_migrations, AppState, Config};
use dotenvy::dotenv;

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let state = match &config.database_url {
        Some(url) => {
            let pool = create_pool(url, config.db_pool_size).map_err(io::Error::other)?;
            run_migrations(&pool).map_err(io::Error::other)?;
            log::info!("using PostgreSQL storage (pool size {})", config.db_pool_size);
            AppState::postgres(pool)
        }
        None => {
            log::warn!("DATABASE_URL not set, using in-memory storage; data is lost on restart");
            AppState::in_memory()
        }
    };

    log::info!("Starting server at http://{}:{}", config.host, config.port);

    build_server(state, &config.host, config.port)?.await
}
