//! # strata-core: Pure Data-Access Types for strata
//!
//! This crate holds the vocabulary every repository speaks: how an entity maps
//! to a table, when a primary key counts as "set", how predicates and pages are
//! described. It has zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        strata Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  Application code                               │   │
//! │  │    ExpenseRepository, CategoryRepository, services...          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ strata-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  entity   │  │  filter   │  │   page    │  │   value   │  │   │
//! │  │   │  Entity   │  │  Filter   │  │PageRequest│  │   Value   │  │   │
//! │  │   │  RepoKey  │  │ CompareOp │  │  Paged    │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO SQL • NO DATABASE • PURE TYPES                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    strata-db (Database Layer)                   │   │
//! │  │           SqliteStore, SqlRepository, migrations, pool          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`entity`] - `Entity` mapping trait, `RepoKey`, `EntityMap`
//! - [`filter`] - `Filter` predicate expression tree
//! - [`page`] - `PageRequest` and `Paged` results
//! - [`value`] - `Value` storage scalar
//! - [`error`] - `MappingError`
//!
//! ## Example Usage
//!
//! ```rust
//! use strata_core::{Filter, PageRequest, RepoKey};
//!
//! // Keys are "set" when they differ from the type's default
//! assert!(!0_i64.is_set());
//! assert!(42_i64.is_set());
//!
//! // Predicates are values, not SQL
//! let filter = Filter::eq("category_id", "groceries").and(Filter::ge("amount_cents", 1_000));
//! assert_eq!(filter.columns(), vec!["category_id", "amount_cents"]);
//!
//! // Page numbers convert to skip/take
//! assert_eq!(PageRequest::page(2, 25), PageRequest::new(25, 25));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod entity;
pub mod error;
pub mod filter;
pub mod page;
pub mod value;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use entity::{Entity, EntityMap, GeneratedKey, RepoKey};
pub use error::{MappingError, MappingResult};
pub use filter::{CompareOp, Filter};
pub use page::{PageRequest, Paged, DEFAULT_PAGE_SIZE};
pub use value::Value;
