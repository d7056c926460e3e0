use crate::chain::{MetadataInterpreter, MetadataSource};
use crate::error::{MetadataError, Result};
use crate::rule::{Rule, RuleTable, VName};
use serde::Deserialize;

/// One element of the rule array as written by metadata producers.
#[derive(Debug, Deserialize)]
struct RawRule {
    begin: Option<u64>,
    end: Option<u64>,
    #[serde(default)]
    edge_in: String,
    edge_out: Option<String>,
    node_id: Option<VName>,
    #[serde(default)]
    reverse_edge: bool,
    #[serde(default)]
    generate_anchor: bool,
    anchor_begin: Option<u64>,
    anchor_end: Option<u64>,
}

impl RawRule {
    fn into_rule(self, index: usize) -> Result<Rule> {
        let begin = offset(self.begin, "begin", index)?;
        let end = offset(self.end, "end", index)?;
        let (anchor_begin, anchor_end) = if self.generate_anchor {
            (
                offset(self.anchor_begin, "anchor_begin", index)?,
                offset(self.anchor_end, "anchor_end", index)?,
            )
        } else {
            (0, 0)
        };

        let rule = Rule {
            begin,
            end,
            edge_in: self.edge_in,
            edge_out: self
                .edge_out
                .ok_or_else(|| missing_field("edge_out", index))?,
            vname: self.node_id.ok_or_else(|| missing_field("node_id", index))?,
            reverse_edge: self.reverse_edge,
            generate_anchor: self.generate_anchor,
            anchor_begin,
            anchor_end,
        };
        rule.validate().map_err(|err| match err {
            MetadataError::InvalidRange(msg) => {
                MetadataError::InvalidRange(format!("rule {index}: {msg}"))
            }
            other => other,
        })?;
        Ok(rule)
    }
}

fn missing_field(field: &str, index: usize) -> MetadataError {
    MetadataError::Schema(format!("rule {index}: missing `{field}`"))
}

fn offset(value: Option<u64>, field: &str, index: usize) -> Result<u32> {
    let value = value.ok_or_else(|| missing_field(field, index))?;
    u32::try_from(value).map_err(|_| {
        MetadataError::InvalidRange(format!(
            "rule {index}: `{field}` {value} is not a valid file offset"
        ))
    })
}

/// Reads rule arrays of the form
/// `[{"begin": 0, "end": 3, "edge_out": "defines", "node_id": {...}}, ...]`,
/// found in the decoded comment block or as the whole buffer.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRuleInterpreter;

impl JsonRuleInterpreter {
    pub fn new() -> Self {
        Self
    }

    /// Parse a whole rule array. Any invalid element rejects the payload.
    pub fn load_from_json(json: &[u8]) -> Result<RuleTable> {
        let raw: Vec<RawRule> = serde_json::from_slice(json)?;
        let rules = raw
            .into_iter()
            .enumerate()
            .map(|(index, rule)| rule.into_rule(index))
            .collect::<Result<Vec<_>>>()?;
        Ok(RuleTable::from_rules(rules))
    }
}

impl MetadataInterpreter for JsonRuleInterpreter {
    fn name(&self) -> &'static str {
        "json"
    }

    fn parse_file(&self, source: &MetadataSource<'_>) -> Option<RuleTable> {
        match Self::load_from_json(source.payload) {
            Ok(table) => Some(table),
            Err(err) => {
                log::debug!("{}: not a JSON rule array: {err}", source.raw_filename);
                None
            }
        }
    }
}
