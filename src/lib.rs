//! Rule-driven FTP directory listing parsing.
//!
//! A *server type* describes one family of FTP servers: an autodetection
//! condition over the welcome banner and the `SYST` reply, the columns of its
//! listings, and a grammar of line rules that reads those listings.
//!
//! ```text
//! ServerTypeDef ──▶ ServerType::compile
//!                     ├─ Condition   (condition.rs)   autodetect text
//!                     ├─ columns     (columns.rs)     validated definitions
//!                     └─ Grammar     (grammar.rs)     rule text
//!
//! raw listing ──▶ autodetect / parse_listing (api.rs) ──▶ Vec<ListingItem>
//! ```
//!
//! ```
//! use ftp_listing::{Context, autodetect, builtin_server_types};
//!
//! let listing = b"-rw-r--r--   1 ftp  ftp   1234 Dec 31  2023 notes.txt\n";
//! let found = autodetect(builtin_server_types(), None, "", "UNIX Type: L8", listing, &Context::default())
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(found.server_type.name(), "UNIX");
//! assert_eq!(found.listing.items[0].name, "notes.txt");
//! assert_eq!(found.listing.items[0].size, 1234);
//! ```

mod api;
pub mod columns;
pub mod condition;
pub mod error;
pub mod grammar;
pub mod matcher;
pub mod record;
mod rules;

pub use api::{
    Context, Detection, ParsedListing, ServerType, ServerTypeDef, autodetect, builtin_server_types, parse_listing,
};
pub use columns::{Column, ColumnKind, ColumnRef, validate_columns};
pub use condition::Condition;
pub use error::{
    ColumnError, CompileError, EnglishMessages, ListingError, LowMemory, Message, MessageCatalog, ServerTypeError,
};
pub use grammar::{Grammar, Languages, ListingSession, NextItem};
pub use record::{FieldFlags, FieldSet, FtpDate, FtpTime, ListingItem, Value};
pub use rules::definitions as builtin_definitions;
