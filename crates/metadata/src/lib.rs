//! # Xref Metadata
//!
//! Recovers auxiliary cross-reference rules that tell an indexer which extra
//! graph edges to draw over byte ranges of a source file.
//!
//! ## Pipeline
//!
//! ```text
//! (filename, buffer, search_string)
//!     │
//!     └──> InterpreterChain
//!            ├─ EncodedBlockLocator: `//` or `/* */` base64 block, decoded
//!            │  once (raw buffer when no block is expected)
//!            └─ payload, first match wins
//!                 ├─ JsonRuleInterpreter: rule array ──> RuleTable
//!                 └─ Kythe0Interpreter: kythe0 envelope (+ VNameLookup) ──> RuleTable
//! ```
//!
//! ## Example
//!
//! ```
//! use xref_metadata::{InterpreterChain, MetadataConfig};
//!
//! let chain = InterpreterChain::with_defaults(MetadataConfig::default());
//! // base64 of `[{"begin":0,"end":3,"edge_out":"defines","node_id":{"signature":"f"}}]`
//! let header = "//W3siYmVnaW4iOjAsImVuZCI6MywiZWRnZV9vdXQiOiJkZWZpbmVzIiwibm9kZV9pZCI6eyJzaWduYXR1cmUiOiJmIn19XQ==\n";
//!
//! let table = chain.parse_file("gen/foo.h", header.as_bytes(), "").unwrap();
//! assert_eq!(table.rules_at(0)[0].edge_out, "defines");
//! ```

mod chain;
mod config;
mod error;
mod json;
mod kythe0;
mod locator;
mod rule;

pub use chain::{InterpreterChain, MetadataInterpreter, MetadataSource, VNameLookup};
pub use config::{MetadataConfig, DEFAULT_HEADER_SUFFIX};
pub use error::{MetadataError, Result};
pub use json::JsonRuleInterpreter;
pub use kythe0::{Kythe0Interpreter, DEFINES_BINDING, KYTHE0_TYPE};
pub use locator::{BlockMode, CommentStyle, EncodedBlockLocator};
pub use rule::{Rule, RuleTable, VName};
