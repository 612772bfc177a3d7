use std::sync::Arc;

use crate::{
    config::StoreSettings,
    db::{DbPool, OrmConn, create_orm_conn},
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub settings: Arc<StoreSettings>,
    pub jwt_secret: Arc<str>,
}

impl AppState {
    pub fn new(pool: DbPool, settings: StoreSettings, jwt_secret: &str) -> Self {
        let orm = create_orm_conn(&pool);
        Self {
            pool,
            orm,
            settings: Arc::new(settings),
            jwt_secret: Arc::from(jwt_secret),
        }
    }
}
