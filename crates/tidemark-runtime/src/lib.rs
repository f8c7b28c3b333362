pub mod db;
pub mod migrations;
pub mod snapshot;
pub mod workflows;

#[cfg(test)]
pub(crate) mod testing;

pub use db::{connect, create_database_if_missing, drop_database, SchemaTarget};
pub use migrations::{
    DraftMode, DraftStage, MigrationCatalog, MigrationExecutor, MigrationStatus, Promoter,
    RunReport, VersionStore,
};
pub use snapshot::SchemaSnapshotter;
pub use workflows::{DeployReport, Project};
