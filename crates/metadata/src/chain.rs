use crate::config::MetadataConfig;
use crate::json::JsonRuleInterpreter;
use crate::kythe0::Kythe0Interpreter;
use crate::locator::EncodedBlockLocator;
use crate::rule::{RuleTable, VName};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Resolves a file path to the node identifier of that file.
///
/// Returns `None` when the path cannot be resolved.
pub type VNameLookup = Arc<dyn Fn(&str) -> Option<VName> + Send + Sync>;

/// A file handed to interpreters.
#[derive(Debug, Clone, Copy)]
pub struct MetadataSource<'a> {
    /// Filename as supplied by the caller.
    pub raw_filename: &'a str,
    /// `raw_filename` with any header suffix removed.
    pub filename: &'a str,
    /// File contents as supplied by the caller.
    pub buffer: &'a [u8],
    /// Bytes to interpret: the decoded comment block when the file embeds
    /// one, `buffer` itself otherwise.
    pub payload: &'a [u8],
}

/// Converts one metadata format into a [`RuleTable`].
///
/// Implementations must be callable from several threads at once after
/// setup is done.
pub trait MetadataInterpreter: Send + Sync {
    fn name(&self) -> &'static str;

    /// `None` means "not my format"; the next interpreter gets a try.
    fn parse_file(&self, source: &MetadataSource<'_>) -> Option<RuleTable>;

    /// Receive the node identifier resolver. Ignored by default.
    fn use_vname_lookup(&mut self, _lookup: VNameLookup) {}
}

/// Ordered list of interpreters; the first one to return a table wins.
///
/// The chain locates and decodes an embedded block once per file, according
/// to its own [`MetadataConfig`], and hands the result to every interpreter.
///
/// Setup (`add`, `use_vname_lookup`) takes `&mut self`, so it cannot overlap
/// with `parse_file` calls made through a shared reference.
#[derive(Default)]
pub struct InterpreterChain {
    locator: EncodedBlockLocator,
    interpreters: Vec<Box<dyn MetadataInterpreter>>,
    lookup: Option<VNameLookup>,
}

impl InterpreterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: MetadataConfig) -> Self {
        Self {
            locator: EncodedBlockLocator::new(config),
            ..Self::default()
        }
    }

    /// Chain with the built-in JSON and kythe0 interpreters registered.
    pub fn with_defaults(config: MetadataConfig) -> Self {
        let mut chain = Self::with_config(config);
        chain.add(Box::new(JsonRuleInterpreter::new()));
        chain.add(Box::new(Kythe0Interpreter::new()));
        chain
    }

    pub fn config(&self) -> &MetadataConfig {
        self.locator.config()
    }

    pub fn add(&mut self, interpreter: Box<dyn MetadataInterpreter>) {
        log::trace!("registered metadata interpreter {}", interpreter.name());
        self.interpreters.push(interpreter);
    }

    pub fn len(&self) -> usize {
        self.interpreters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interpreters.is_empty()
    }

    /// Store `lookup` and hand it to every interpreter registered so far.
    pub fn use_vname_lookup(&mut self, lookup: VNameLookup) {
        for interpreter in &mut self.interpreters {
            interpreter.use_vname_lookup(Arc::clone(&lookup));
        }
        self.lookup = Some(lookup);
    }

    pub fn vname_lookup(&self) -> Option<&VNameLookup> {
        self.lookup.as_ref()
    }

    pub fn parse_file(
        &self,
        filename: &str,
        buffer: &[u8],
        search_string: &str,
    ) -> Option<RuleTable> {
        let config = self.locator.config();
        let stripped = if config.effective_search_string(search_string).is_empty() {
            config.strip_header_suffix(filename)
        } else {
            filename
        };
        // A file expected to embed a block but carrying a malformed one has
        // no metadata; interpreters are not consulted.
        let payload = match self.locator.mode(filename, search_string) {
            Some(_) => Cow::Owned(self.locator.locate(filename, buffer, search_string)?),
            None => Cow::Borrowed(buffer),
        };
        let source = MetadataSource {
            raw_filename: filename,
            filename: stripped,
            buffer,
            payload: &payload,
        };

        for interpreter in &self.interpreters {
            if let Some(table) = interpreter.parse_file(&source) {
                log::debug!(
                    "{filename}: {} rules from {} interpreter",
                    table.len(),
                    interpreter.name()
                );
                return Some(table);
            }
        }
        log::debug!("{filename}: no metadata found");
        None
    }
}

impl fmt::Debug for InterpreterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterpreterChain")
            .field("config", self.locator.config())
            .field(
                "interpreters",
                &self.interpreters.iter().map(|i| i.name()).collect::<Vec<_>>(),
            )
            .field("has_lookup", &self.lookup.is_some())
            .finish()
    }
}
