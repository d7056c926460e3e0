use crate::chain::{MetadataInterpreter, MetadataSource, VNameLookup};
use crate::error::{MetadataError, Result};
use crate::rule::{Rule, RuleTable, VName};
use serde::Deserialize;

pub const KYTHE0_TYPE: &str = "kythe0";
pub const DEFINES_BINDING: &str = "/kythe/edge/defines/binding";

/// Edges prefixed with this are drawn from the node to the anchor.
const REVERSE_EDGE_PREFIX: char = '%';

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    meta: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Entry {
    Nop,
    AnchorDefines {
        begin: u32,
        end: u32,
        edge: String,
        vname: VName,
    },
    AnchorAnchor {
        source_begin: u32,
        source_end: u32,
        target_begin: u32,
        target_end: u32,
        edge: String,
        #[serde(default)]
        source_vname: Option<VName>,
        #[serde(default)]
        source_path: Option<String>,
    },
}

fn split_edge(edge: String) -> (String, bool) {
    match edge.strip_prefix(REVERSE_EDGE_PREFIX) {
        Some(stripped) => (stripped.to_string(), true),
        None => (edge, false),
    }
}

/// Reads the enveloped `{"type": "kythe0", "meta": [...]}` format.
///
/// `anchor_anchor` entries naming their source file by `source_path` need a
/// [`VNameLookup`]; without one (or when it fails) the whole file is declined.
/// A `source_vname` given alongside the path overrides the resolved fields.
#[derive(Clone, Default)]
pub struct Kythe0Interpreter {
    lookup: Option<VNameLookup>,
}

impl Kythe0Interpreter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from_json(&self, json: &[u8]) -> Result<RuleTable> {
        let envelope: Envelope = serde_json::from_slice(json)?;
        if envelope.kind != KYTHE0_TYPE {
            return Err(MetadataError::Schema(format!(
                "unsupported metadata type {:?}",
                envelope.kind
            )));
        }

        let mut rules = Vec::with_capacity(envelope.meta.len());
        for entry in envelope.meta {
            if let Some(rule) = self.convert(entry)? {
                rule.validate()?;
                rules.push(rule);
            }
        }
        Ok(RuleTable::from_rules(rules))
    }

    fn convert(&self, entry: Entry) -> Result<Option<Rule>> {
        let rule = match entry {
            Entry::Nop => return Ok(None),
            Entry::AnchorDefines {
                begin,
                end,
                edge,
                vname,
            } => {
                let (edge_out, reverse_edge) = split_edge(edge);
                Rule {
                    begin,
                    end,
                    edge_in: DEFINES_BINDING.to_string(),
                    edge_out,
                    vname,
                    reverse_edge,
                    ..Rule::default()
                }
            }
            Entry::AnchorAnchor {
                source_begin,
                source_end,
                target_begin,
                target_end,
                edge,
                source_vname,
                source_path,
            } => {
                let vname = match (source_vname, source_path) {
                    (Some(vname), None) => vname,
                    (explicit, Some(path)) => {
                        let mut resolved = self.resolve(&path)?;
                        if let Some(explicit) = explicit {
                            resolved.merge_from(&explicit);
                        }
                        resolved
                    }
                    (None, None) => {
                        return Err(MetadataError::Schema(
                            "anchor_anchor needs source_vname or source_path".to_string(),
                        ))
                    }
                };
                let (edge_out, reverse_edge) = split_edge(edge);
                Rule {
                    begin: target_begin,
                    end: target_end,
                    edge_in: DEFINES_BINDING.to_string(),
                    edge_out,
                    vname,
                    reverse_edge,
                    generate_anchor: true,
                    anchor_begin: source_begin,
                    anchor_end: source_end,
                }
            }
        };
        Ok(Some(rule))
    }

    fn resolve(&self, path: &str) -> Result<VName> {
        self.lookup
            .as_ref()
            .and_then(|lookup| lookup(path))
            .ok_or_else(|| MetadataError::Lookup(path.to_string()))
    }
}

impl MetadataInterpreter for Kythe0Interpreter {
    fn name(&self) -> &'static str {
        KYTHE0_TYPE
    }

    fn parse_file(&self, source: &MetadataSource<'_>) -> Option<RuleTable> {
        match self.load_from_json(source.payload) {
            Ok(table) => Some(table),
            Err(err) => {
                log::debug!("{}: not kythe0 metadata: {err}", source.raw_filename);
                None
            }
        }
    }

    fn use_vname_lookup(&mut self, lookup: VNameLookup) {
        self.lookup = Some(lookup);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    const DEFINES: &[u8] = br#"{"type":"kythe0","meta":[
        {"type":"nop"},
        {"type":"anchor_defines","begin":10,"end":13,"edge":"%/kythe/edge/generates",
         "vname":{"signature":"sig","corpus":"c","path":"a.proto","language":"protobuf"},
         "semantic":"set"}
    ]}"#;

    const ANCHOR_BY_PATH: &[u8] = br#"{"type":"kythe0","meta":[
        {"type":"anchor_anchor","source_begin":1,"source_end":4,"target_begin":30,
         "target_end":34,"edge":"/kythe/edge/imputes","source_path":"src/a.proto"}
    ]}"#;

    #[test]
    fn anchor_defines_becomes_rule() {
        let table = Kythe0Interpreter::default().load_from_json(DEFINES).unwrap();
        assert_eq!(table.len(), 1);

        let rule = &table.rules_at(10)[0];
        assert_eq!(rule.end, 13);
        assert_eq!(rule.edge_in, DEFINES_BINDING);
        assert_eq!(rule.edge_out, "/kythe/edge/generates");
        assert!(rule.reverse_edge);
        assert!(!rule.generate_anchor);
        assert_eq!(rule.vname.signature, "sig");
    }

    #[test]
    fn anchor_anchor_resolves_source_path() {
        let mut interpreter = Kythe0Interpreter::default();
        interpreter.use_vname_lookup(Arc::new(|path: &str| {
            (path == "src/a.proto").then(|| VName {
                corpus: "c".into(),
                path: path.to_string(),
                ..VName::default()
            })
        }));

        let table = interpreter.load_from_json(ANCHOR_BY_PATH).unwrap();
        let rule = &table.rules_at(30)[0];
        assert!(rule.generate_anchor);
        assert_eq!((rule.anchor_begin, rule.anchor_end), (1, 4));
        assert_eq!(rule.vname.path, "src/a.proto");
        assert!(!rule.reverse_edge);
    }

    #[test]
    fn explicit_vname_fields_override_lookup() {
        let mut interpreter = Kythe0Interpreter::default();
        interpreter.use_vname_lookup(Arc::new(|path: &str| {
            Some(VName {
                corpus: "resolved".into(),
                path: path.to_string(),
                ..VName::default()
            })
        }));

        let table = interpreter
            .load_from_json(
                br#"{"type":"kythe0","meta":[{"type":"anchor_anchor","source_begin":0,
                    "source_end":2,"target_begin":5,"target_end":6,"edge":"e",
                    "source_path":"a.proto","source_vname":{"signature":"m","corpus":"pinned"}}]}"#,
            )
            .unwrap();
        let vname = &table.rules_at(5)[0].vname;
        assert_eq!(vname.corpus, "pinned");
        assert_eq!(vname.path, "a.proto");
        assert_eq!(vname.signature, "m");
    }

    #[test]
    fn source_vname_alone_needs_no_lookup() {
        let table = Kythe0Interpreter::new()
            .load_from_json(
                br#"{"type":"kythe0","meta":[{"type":"anchor_anchor","source_begin":2,
                    "source_end":7,"target_begin":40,"target_end":45,"edge":"%/kythe/edge/imputes",
                    "source_vname":{"signature":"s","corpus":"c","path":"p.proto","language":"protobuf"}}]}"#,
            )
            .unwrap();

        let rule = &table.rules_at(40)[0];
        assert_eq!(
            rule.vname,
            VName {
                signature: "s".into(),
                corpus: "c".into(),
                root: String::new(),
                path: "p.proto".into(),
                language: "protobuf".into(),
            }
        );
        assert_eq!(rule.end, 45);
        assert_eq!((rule.anchor_begin, rule.anchor_end), (2, 7));
        assert!(rule.generate_anchor);
        assert!(rule.reverse_edge);
        assert_eq!(rule.edge_out, "/kythe/edge/imputes");
    }

    #[test]
    fn unresolved_source_path_declines() {
        let without_lookup = Kythe0Interpreter::default();
        assert!(matches!(
            without_lookup.load_from_json(ANCHOR_BY_PATH),
            Err(MetadataError::Lookup(_))
        ));

        let mut failing = Kythe0Interpreter::default();
        failing.use_vname_lookup(Arc::new(|_: &str| -> Option<VName> { None }));
        assert!(failing.load_from_json(ANCHOR_BY_PATH).is_err());
    }

    #[test]
    fn rejects_foreign_envelopes() {
        let interpreter = Kythe0Interpreter::default();
        let cases: [&[u8]; 5] = [
            br#"{"type":"kythe1","meta":[]}"#,
            br#"{"type":"kythe0","meta":[{"type":"mystery"}]}"#,
            br#"{"type":"kythe0","meta":[{"type":"anchor_defines","begin":5,"end":1,"edge":"e","vname":{}}]}"#,
            br#"{"type":"kythe0","meta":[{"type":"anchor_anchor","source_begin":0,"source_end":1,"target_begin":0,"target_end":1,"edge":"e"}]}"#,
            br#"[{"begin":0,"end":1,"edge_out":"e","node_id":{}}]"#,
        ];
        for case in cases {
            assert!(
                interpreter.load_from_json(case).is_err(),
                "{}",
                String::from_utf8_lossy(case)
            );
        }
    }

    #[test]
    fn parse_file_reads_payload() {
        let interpreter = Kythe0Interpreter::default();
        let source = MetadataSource {
            raw_filename: "gen.pb.meta",
            filename: "gen.pb.meta",
            buffer: DEFINES,
            payload: DEFINES,
        };
        assert!(interpreter.parse_file(&source).is_some());
        assert!(interpreter
            .parse_file(&MetadataSource {
                payload: b"[]",
                ..source
            })
            .is_none());
    }
}
