use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::path::Path;
use std::sync::Arc;
use xref_metadata::{InterpreterChain, MetadataConfig, VName};

const BLOCK_LINE_WIDTH: usize = 76;

fn load_config(path: &Path) -> Result<MetadataConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    MetadataConfig::from_toml_str(&text)
        .with_context(|| format!("parse config {}", path.display()))
}

/// Print the rule table for `file`. Returns false when it carries none.
pub fn inspect(
    file: &Path,
    search_string: &str,
    config: Option<&Path>,
    corpus: Option<String>,
) -> Result<bool> {
    let config = match config {
        Some(path) => load_config(path)?,
        None => MetadataConfig::default(),
    };

    let mut chain = InterpreterChain::with_defaults(config);
    if let Some(corpus) = corpus {
        chain.use_vname_lookup(Arc::new(move |path: &str| {
            Some(VName {
                corpus: corpus.clone(),
                path: path.to_string(),
                ..VName::default()
            })
        }));
    }

    let buffer = std::fs::read(file).with_context(|| format!("read {}", file.display()))?;
    let filename = file.to_string_lossy();
    log::info!("Inspecting {filename} ({} bytes)", buffer.len());

    match chain.parse_file(&filename, &buffer, search_string) {
        Some(table) => {
            println!("{}", serde_json::to_string_pretty(&table)?);
            Ok(true)
        }
        None => {
            eprintln!("No metadata found in {filename}");
            Ok(false)
        }
    }
}

/// Print `file` as a comment header.
pub fn encode(file: &Path, block: bool) -> Result<()> {
    let bytes = std::fs::read(file).with_context(|| format!("read {}", file.display()))?;
    serde_json::from_slice::<serde_json::Value>(&bytes)
        .with_context(|| format!("{} is not JSON", file.display()))?;
    print!("{}", comment_header(&bytes, block));
    Ok(())
}

fn comment_header(bytes: &[u8], block: bool) -> String {
    let encoded = STANDARD.encode(bytes);
    if !block {
        return format!("//{encoded}\n");
    }

    let mut out = String::from("/*\n");
    for line in encoded.as_bytes().chunks(BLOCK_LINE_WIDTH) {
        out.push_str(&String::from_utf8_lossy(line));
        out.push('\n');
    }
    out.push_str("*/\n");
    out
}
