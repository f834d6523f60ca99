//! AgriMarket - marketplace listing service
//!
//! Farmer-to-buyer marketplace for harvested crops: listings with an
//! inventory reservation ledger, a lifecycle state machine, lazy
//! expiration and a buyer-facing discovery catalog.
//!
//! # Module structure
//!
//! ```text
//! market-server/src/
//! ├── core/          # config, state, server, errors
//! ├── listings/      # lifecycle service (the only write path)
//! ├── services/      # cross-service publish client
//! ├── api/           # HTTP routes and handlers
//! ├── utils/         # errors, logging, validation
//! └── db/            # embedded SurrealDB models + repositories
//! ```

pub mod api;
pub mod core;
pub mod db;
pub mod listings;
pub mod services;
pub mod utils;

// Re-export common types
pub use core::{Config, Server, ServerState};
pub use listings::{ListingError, ListingService};
pub use utils::{AppError, AppResult};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

pub fn print_banner() {
    println!(
        r#"
    ___           _ __  ___           __        __
   /   | ____ ___(_) /|/  /___ ______/ /_____  / /_
  / /| |/ __ `/ __/ / /|_/ / __ `/ ___/ //_/ _ \/ __/
 / ___ / /_/ / / / / /  / / /_/ / /  / ,< /  __/ /_
/_/  |_\__, /_/ /_/_/  /_/\__,_/_/  /_/|_|\___/\__/
      /____/
    "#
    );
}
