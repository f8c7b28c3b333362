mod catalog;
mod draft;
mod executor;
mod promoter;
pub mod sql;
mod status;
mod version;

pub use catalog::{CatalogEntry, MigrationCatalog};
pub use draft::DraftStage;
pub use executor::{DraftMode, DraftOutcome, MigrationExecutor, RunReport};
pub use promoter::{Promoter, Promotion};
pub use status::{status, MigrationStatus};
pub use version::VersionStore;
