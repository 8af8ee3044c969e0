//! Headless presentation-layer handlers.

pub mod retain;
pub mod save;

use std::path::PathBuf;
use std::sync::Arc;

use printhub_core::config::{ConsumerAction, ConsumerConfig};
use printhub_storage::SpoolStore;

pub use retain::RetainHandler;
pub use save::SaveHandler;

use crate::executor::JobHandler;

/// Build the handler selected by `config.action`.
pub fn from_config(
    config: &ConsumerConfig,
    home: Option<PathBuf>,
    store: Arc<SpoolStore>,
) -> Arc<dyn JobHandler> {
    match config.action {
        ConsumerAction::Save => Arc::new(SaveHandler::new(
            config.resolve_output_dir(home),
            config.delete_after_save,
            store,
        )),
        ConsumerAction::Retain => Arc::new(RetainHandler),
    }
}
