// ─── modsync Core ───
// Keeps a game directory's add-ons in line with the projects a Modrinth
// account follows.
//
// Architecture:
//   core/
//     config/    : Settings file + environment overrides
//     platform/  : Categories, side support, target platform
//     registry/  : Modrinth API models + client
//     store/     : Tracked items and version history (SQLite)
//     vault/     : Staged placement, archiving, restore
//     reconcile/ : Classification, concurrent sync engine, status survey
//     rollback/  : Restore the previous version of one project
//     importer/  : Adopt untracked files by hash
//     events/    : Progress events for observers
//     state/     : Per-process wiring of client, store and vault

pub mod config;
pub mod error;
pub mod events;
pub mod http;
pub mod importer;
pub mod platform;
pub mod reconcile;
pub mod registry;
pub mod rollback;
pub mod state;
pub mod store;
pub mod vault;

#[cfg(test)]
pub(crate) mod testing;
