use std::sync::Arc;

use festa_service::FestaService;
use festa_storage::{db::Db, pg::PgStore};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<FestaService>,
}
impl AppState {
	pub async fn new(config: festa_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		let store = PgStore::new(db.pool.clone());
		let service = FestaService::new(config, Arc::new(store));

		Ok(Self { service: Arc::new(service) })
	}
}
