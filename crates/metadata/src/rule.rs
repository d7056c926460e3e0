use crate::error::{MetadataError, Result};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::ops::RangeBounds;

/// Identifier of a semantic node in the cross-reference graph.
///
/// Carried through untouched; the core never interprets its components.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct VName {
    pub signature: String,
    pub corpus: String,
    pub root: String,
    pub path: String,
    pub language: String,
}

impl VName {
    /// Overwrite every field that is non-empty in `other`.
    pub fn merge_from(&mut self, other: &VName) {
        for (dst, src) in [
            (&mut self.signature, &other.signature),
            (&mut self.corpus, &other.corpus),
            (&mut self.root, &other.root),
            (&mut self.path, &other.path),
            (&mut self.language, &other.language),
        ] {
            if !src.is_empty() {
                dst.clone_from(src);
            }
        }
    }
}

/// A single metadata rule over the byte range `[begin, end)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Rule {
    pub begin: u32,
    pub end: u32,
    /// Edge kind that must already leave an anchor over `[begin, end)`.
    /// Empty means the rule applies unconditionally.
    pub edge_in: String,
    /// Edge kind to create.
    pub edge_out: String,
    #[serde(rename = "node_id")]
    pub vname: VName,
    /// If false, draw the edge to `vname`; if true, draw it from `vname`.
    pub reverse_edge: bool,
    pub generate_anchor: bool,
    pub anchor_begin: u32,
    pub anchor_end: u32,
}

impl Rule {
    pub fn validate(&self) -> Result<()> {
        if self.begin > self.end {
            return Err(MetadataError::InvalidRange(format!(
                "begin {} is past end {}",
                self.begin, self.end
            )));
        }
        if self.generate_anchor && self.anchor_begin > self.anchor_end {
            return Err(MetadataError::InvalidRange(format!(
                "anchor_begin {} is past anchor_end {}",
                self.anchor_begin, self.anchor_end
            )));
        }
        Ok(())
    }
}

/// Immutable set of rules keyed on `begin`.
///
/// Rules sharing a `begin` keep the order they were supplied in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleTable {
    rules: BTreeMap<u32, Vec<Rule>>,
    len: usize,
}

impl RuleTable {
    pub fn from_rules<I>(rules: I) -> Self
    where
        I: IntoIterator<Item = Rule>,
    {
        let mut by_begin: BTreeMap<u32, Vec<Rule>> = BTreeMap::new();
        let mut len = 0;
        for rule in rules {
            by_begin.entry(rule.begin).or_default().push(rule);
            len += 1;
        }
        Self {
            rules: by_begin,
            len,
        }
    }

    /// Rules to apply keyed on `begin`.
    pub fn rules(&self) -> &BTreeMap<u32, Vec<Rule>> {
        &self.rules
    }

    pub fn rules_at(&self, begin: u32) -> &[Rule] {
        self.rules.get(&begin).map(Vec::as_slice).unwrap_or_default()
    }

    /// Rules whose `begin` falls inside `range`, in key order.
    pub fn rules_in<R>(&self, range: R) -> impl Iterator<Item = &Rule>
    where
        R: RangeBounds<u32>,
    {
        self.rules.range(range).flat_map(|(_, rules)| rules.iter())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl FromIterator<Rule> for RuleTable {
    fn from_iter<T: IntoIterator<Item = Rule>>(iter: T) -> Self {
        Self::from_rules(iter)
    }
}

impl Serialize for RuleTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rule(begin: u32, end: u32, edge_out: &str) -> Rule {
        Rule {
            begin,
            end,
            edge_out: edge_out.to_string(),
            ..Rule::default()
        }
    }

    #[test]
    fn groups_rules_by_begin_without_loss() {
        let input = vec![
            rule(10, 12, "a"),
            rule(0, 3, "b"),
            rule(10, 20, "c"),
            rule(5, 5, "d"),
        ];
        let table = RuleTable::from_rules(input.clone());

        assert_eq!(table.len(), 4);
        assert_eq!(table.rules().keys().copied().collect::<Vec<_>>(), vec![0, 5, 10]);
        assert_eq!(table.rules_at(10), &[input[0].clone(), input[2].clone()]);
        assert_eq!(table.rules_at(0), &[input[1].clone()]);
        assert!(table.rules_at(7).is_empty());

        let mut flattened: Vec<Rule> = table.iter().cloned().collect();
        let mut expected = input;
        flattened.sort_by(|a, b| (a.begin, &a.edge_out).cmp(&(b.begin, &b.edge_out)));
        expected.sort_by(|a, b| (a.begin, &a.edge_out).cmp(&(b.begin, &b.edge_out)));
        assert_eq!(flattened, expected);
    }

    #[test]
    fn rules_in_respects_range_bounds() {
        let table: RuleTable = vec![rule(1, 2, "a"), rule(4, 6, "b"), rule(9, 9, "c")]
            .into_iter()
            .collect();

        let hits: Vec<&str> = table.rules_in(2..=9).map(|r| r.edge_out.as_str()).collect();
        assert_eq!(hits, vec!["b", "c"]);
        assert_eq!(table.rules_in(..).count(), 3);
    }

    #[test]
    fn empty_table() {
        let table = RuleTable::from_rules(Vec::new());
        assert!(table.is_empty());
        assert_eq!(table.iter().count(), 0);
    }

    #[test]
    fn validate_rejects_inverted_ranges() {
        assert!(rule(3, 1, "x").validate().is_err());
        assert!(rule(3, 3, "x").validate().is_ok());

        let mut generated = rule(0, 1, "x");
        generated.generate_anchor = true;
        generated.anchor_begin = 8;
        generated.anchor_end = 4;
        assert!(generated.validate().is_err());

        // Anchor bounds are ignored unless an anchor is generated.
        generated.generate_anchor = false;
        assert!(generated.validate().is_ok());
    }

    #[test]
    fn merge_from_keeps_fields_missing_in_other() {
        let mut base = VName {
            signature: "sig".into(),
            corpus: "corpus".into(),
            ..VName::default()
        };
        let other = VName {
            corpus: "other".into(),
            path: "a/b.h".into(),
            ..VName::default()
        };
        base.merge_from(&other);

        assert_eq!(base.signature, "sig");
        assert_eq!(base.corpus, "other");
        assert_eq!(base.path, "a/b.h");
    }

    #[test]
    fn serializes_as_flat_array() {
        let table = RuleTable::from_rules(vec![rule(4, 5, "late"), rule(1, 2, "early")]);
        let value = serde_json::to_value(&table).unwrap();
        assert_eq!(value[0]["edge_out"], "early");
        assert_eq!(value[1]["edge_out"], "late");
        assert!(value[0]["node_id"].is_object());
    }
}
