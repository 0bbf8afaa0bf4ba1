//! # boardpulse-adapters
//!
//! Remote clients that fetch a board and assemble it into a
//! boardpulse [`Snapshot`].
//!
//! ## Supported Systems
//!
//! - **Trello** (`trello` feature) - Board, lists, members, cards, labels and
//!   per-card action histories via the Trello REST API
//!
//! ## Quick Start (Trello)
//!
//! ```rust,no_run
//! use boardpulse_adapters::trello::TrelloClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = TrelloClient::builder()
//!         .credentials("api-key", "token")
//!         .board_id("pOy2Ba0G")
//!         .build()?;
//!
//!     println!("{}", client.test_connection().await?);
//!
//!     let snapshot = client.fetch_snapshot().await?;
//!     println!("Fetched {} cards", snapshot.cards.len());
//!     Ok(())
//! }
//! ```

pub mod error;

#[cfg(feature = "trello")]
pub mod trello;

pub use error::{ConfigurationError, FetchError};

// Re-export types for convenience
pub use boardpulse_types::{Action, Board, BoardList, Card, Label, Member, Snapshot, Timestamp};
