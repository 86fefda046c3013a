use std::sync::Arc;

use log::Logger;

use crate::dashboard::Figures;
use crate::db::Repository;
use crate::urls::Urls;

pub type SafeRepository = dyn Repository + Send + Sync;

pub type SafeFigures = dyn Figures + Send + Sync;

/// Everything a route handler needs, constructed once at startup and
/// cloned into each route.
#[derive(Clone)]
pub struct Environment {
    pub logger: Arc<Logger>,
    pub repository: Arc<SafeRepository>,
    pub figures: Arc<SafeFigures>,
    pub urls: Arc<Urls>,
}

impl Environment {
    pub fn new(
        logger: Arc<Logger>,
        repository: Arc<SafeRepository>,
        figures: Arc<SafeFigures>,
        urls: Arc<Urls>,
    ) -> Self {
        Self {
            logger,
            repository,
            figures,
            urls,
        }
    }
}
