pub mod folders;
pub mod invoices;
pub mod sync;

use std::sync::Arc;

use crate::config::Config;
use crate::db::Database;

pub struct AppContext {
    pub config: Config,
    pub db: Arc<Database>,
}
