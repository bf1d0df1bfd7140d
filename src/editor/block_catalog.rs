//! Block templates and the catalog they are picked from.
//!
//! A block kind is pure data: its ordered typed ports, target language and
//! the code template handed to the generator. Nothing here knows how code is
//! generated; that is keyed by [`BlockTemplate::kind`] outside this crate.
//!
//! # Usage
//!
//! ```rust,ignore
//! use flowcanvas::editor::block_catalog::BlockCatalog;
//!
//! let catalog = BlockCatalog::builtin();
//! let matches: Vec<_> = catalog.iter().filter(|t| t.matches_query("image")).collect();
//! ```

use anyhow::{Context, Result};
use camino::Utf8Path;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::model::{Block, BlockId, LanguageId, Point, Port, Size};
use crate::port_types::{PortTypeInfo, PortTypeRegistry};

/// What the rest of the system needs to know about a kind of block.
pub trait BlockKind {
    fn ports_in(&self) -> &[Port];
    fn ports_out(&self) -> &[Port];
    /// Code template consumed by the generator.
    fn template_text(&self) -> &str;
}

/// A single entry in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockTemplate {
    /// Unique kind identifier (e.g. `"new_double"`).
    pub kind: String,
    /// Name shown in the block browser and on the canvas.
    pub label: String,
    pub language: LanguageId,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub in_ports: Vec<Port>,
    #[serde(default)]
    pub out_ports: Vec<Port>,
    /// Block fill color as `"r:g:b:a"`.
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub code: String,
}

impl BlockTemplate {
    /// Case-insensitive substring match on kind, label, category or description.
    pub fn matches_query(&self, query: &str) -> bool {
        if query.is_empty() {
            return true;
        }
        let q = query.to_lowercase();
        self.kind.to_lowercase().contains(&q)
            || self.label.to_lowercase().contains(&q)
            || self.category.to_lowercase().contains(&q)
            || self.description.to_lowercase().contains(&q)
    }

    /// Create a block for this template at `position`. The id is a
    /// placeholder until the block is inserted into a diagram.
    pub fn instantiate(&self, position: Point, size: Size) -> Block {
        Block {
            id: BlockId::default(),
            kind: self.kind.clone(),
            label: self.label.clone(),
            language: self.language.clone(),
            in_ports: self.in_ports.clone(),
            out_ports: self.out_ports.clone(),
            position,
            size,
        }
    }
}

impl BlockKind for BlockTemplate {
    fn ports_in(&self) -> &[Port] {
        &self.in_ports
    }

    fn ports_out(&self) -> &[Port] {
        &self.out_ports
    }

    fn template_text(&self) -> &str {
        &self.code
    }
}

/// On-disk shape of a catalog definition file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub port_types: Vec<PortTypeInfo>,
    #[serde(default)]
    pub blocks: Vec<BlockTemplate>,
}

/// A category of templates, in catalog order.
#[derive(Debug, Clone)]
pub struct BlockCatalogCategory {
    pub name: String,
    pub entries: Vec<BlockTemplate>,
}

/// The set of templates available to an editor, plus the port types they use.
#[derive(Debug, Clone, Default)]
pub struct BlockCatalog {
    templates: IndexMap<String, BlockTemplate>,
    port_types: PortTypeRegistry,
}

impl BlockCatalog {
    pub fn new(port_types: PortTypeRegistry) -> Self {
        Self {
            templates: IndexMap::new(),
            port_types,
        }
    }

    /// The built-in catalog, built once and cloned on each call.
    pub fn builtin() -> Self {
        static BUILTIN: Lazy<BlockCatalog> = Lazy::new(build_builtin);
        BUILTIN.clone()
    }

    pub fn from_file(file: CatalogFile) -> Self {
        let mut catalog = Self::new(PortTypeRegistry::from_definitions(file.port_types));
        for template in file.blocks {
            catalog.add(template);
        }
        catalog
    }

    /// Load a JSON catalog definition.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("Open {}", path))?;
        let file: CatalogFile =
            serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path))?;
        for template in &file.blocks {
            for port in template.in_ports.iter().chain(&template.out_ports) {
                if !file.port_types.iter().any(|t| t.type_id == port.type_id) {
                    anyhow::bail!(
                        "Block '{}' uses undeclared port type '{}'",
                        template.kind,
                        port.type_id
                    );
                }
            }
        }
        Ok(Self::from_file(file))
    }

    /// Replace or insert a template.
    pub fn add(&mut self, template: BlockTemplate) {
        self.templates.insert(template.kind.clone(), template);
    }

    pub fn get(&self, kind: &str) -> Option<&BlockTemplate> {
        self.templates.get(kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlockTemplate> {
        self.templates.values()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn port_types(&self) -> &PortTypeRegistry {
        &self.port_types
    }

    /// Templates grouped by category, categories in first-seen order.
    pub fn by_category(&self) -> Vec<BlockCatalogCategory> {
        let mut cat_map: IndexMap<String, Vec<BlockTemplate>> = IndexMap::new();
        for t in self.templates.values() {
            cat_map.entry(t.category.clone()).or_default().push(t.clone());
        }
        cat_map
            .into_iter()
            .map(|(name, entries)| BlockCatalogCategory { name, entries })
            .collect()
    }
}

fn ports(type_id: &str, prefix: &str, labels: &[&str]) -> Vec<Port> {
    labels
        .iter()
        .enumerate()
        .map(|(i, label)| Port::new(type_id, &format!("{prefix}{i}"), label))
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn template(
    kind: &str,
    label: &str,
    language: &str,
    category: &str,
    description: &str,
    in_ports: Vec<Port>,
    out_ports: Vec<Port>,
    code: &str,
) -> BlockTemplate {
    BlockTemplate {
        kind: kind.to_string(),
        label: label.to_string(),
        language: language.to_string(),
        category: category.to_string(),
        description: description.to_string(),
        in_ports,
        out_ports,
        color: None,
        code: code.to_string(),
    }
}

fn build_builtin() -> BlockCatalog {
    let registry = PortTypeRegistry::from_definitions([
        PortTypeInfo::new("double", "Double", false),
        PortTypeInfo::new("int", "Integer", false),
        PortTypeInfo::new("image", "Image", false),
        PortTypeInfo::new("sound", "Sound", true),
    ]);
    let mut c = BlockCatalog::new(registry);

    // ── Basic data types (C) ─────────────────────────────────────────────
    let cat = "Basic Data Type";
    c.add(template(
        "new_double",
        "New Double",
        "c",
        cat,
        "Creates new literal value (Double)",
        vec![],
        ports("double", "out", &["Double"]),
        "block$id$_double_o0 = $value$;\n",
    ));
    c.add(template(
        "new_int",
        "New Int",
        "c",
        cat,
        "Creates new literal value (Int)",
        vec![],
        ports("int", "out", &["Int"]),
        "block$id$_int_o0 = $value$;\n",
    ));

    // ── Arithmetic (C) ───────────────────────────────────────────────────
    let cat = "Arithmetic";
    c.add(template(
        "sum_double",
        "Sum",
        "c",
        cat,
        "Adds two double values",
        ports("double", "in", &["First", "Second"]),
        ports("double", "out", &["Result"]),
        "block$id$_double_o0 = block$id$_double_i0 + block$id$_double_i1;\n",
    ));
    c.add(template(
        "division",
        "Division",
        "c",
        cat,
        "Divides the first image by the second",
        ports("image", "in", &["Dividend", "Divisor"]),
        ports("image", "out", &["Quotient"]),
        "cvDiv(block$id$_img_i0, block$id$_img_i1, block$id$_img_o0, 1);\n",
    ));

    // ── Images (C) ───────────────────────────────────────────────────────
    let cat = "Image Source";
    c.add(template(
        "open_image",
        "Open Image",
        "c",
        cat,
        "Loads an image from a file",
        vec![],
        ports("image", "out", &["Image"]),
        "block$id$_img_o0 = cvLoadImage(\"$filename$\", -1);\n",
    ));
    c.add(template(
        "show_image",
        "Show Image",
        "c",
        "Image Sink",
        "Displays an image in a window",
        ports("image", "in", &["Image"]),
        vec![],
        "cvShowImage(\"block$id$\", block$id$_img_i0);\n",
    ));
    c.add(template(
        "print_double",
        "Print Double",
        "c",
        "Output",
        "Prints a double value to the console",
        ports("double", "in", &["Value"]),
        vec![],
        "printf(\"%f\\n\", block$id$_double_i0);\n",
    ));

    // ── Sound (JavaScript / Web Audio) ───────────────────────────────────
    let cat = "Sound";
    c.add(template(
        "oscillator",
        "Oscillator",
        "javascript",
        cat,
        "Generates a periodic waveform",
        vec![],
        ports("sound", "out", &["Sound"]),
        "var block_$id$ = context.createOscillator();\n",
    ));
    c.add(template(
        "speaker",
        "Speaker",
        "javascript",
        cat,
        "Plays every connected sound",
        ports("sound", "in", &["Sound"]),
        vec![],
        "var block_$id$ = context.destination;\n",
    ));

    c
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use std::io::Write;

    #[test]
    fn test_builtin_entries_have_non_empty_fields() {
        let catalog = BlockCatalog::builtin();
        assert!(!catalog.is_empty());
        for t in catalog.iter() {
            assert!(!t.label.is_empty(), "Empty label for {}", t.kind);
            assert!(!t.language.is_empty(), "Empty language for {}", t.kind);
            assert!(!t.code.is_empty(), "Empty code for {}", t.kind);
        }
    }

    #[test]
    fn test_builtin_port_types_are_registered() {
        let catalog = BlockCatalog::builtin();
        for t in catalog.iter() {
            for p in t.ports_in().iter().chain(t.ports_out()) {
                assert!(
                    catalog.port_types().contains(&p.type_id),
                    "{} uses unregistered type {}",
                    t.kind,
                    p.type_id
                );
            }
        }
    }

    #[test]
    fn test_search() {
        let catalog = BlockCatalog::builtin();
        let matches: Vec<_> = catalog.iter().filter(|t| t.matches_query("IMAGE")).collect();
        assert!(matches.iter().any(|t| t.kind == "show_image"));
        assert_eq!(catalog.iter().filter(|t| t.matches_query("")).count(), catalog.len());
    }

    #[test]
    fn test_by_category_is_consistent() {
        let catalog = BlockCatalog::builtin();
        let total: usize = catalog.by_category().iter().map(|c| c.entries.len()).sum();
        assert_eq!(total, catalog.len());
    }

    #[test]
    fn test_instantiate_copies_ports() {
        let catalog = BlockCatalog::builtin();
        let t = catalog.get("sum_double").unwrap();
        let b = t.instantiate(Point::new(5.0, 6.0), Size::default());
        assert_eq!(b.kind, "sum_double");
        assert_eq!(b.in_ports.len(), 2);
        assert_eq!(b.out_ports.len(), 1);
        assert_eq!(b.position, Point::new(5.0, 6.0));
        assert!(t.template_text().contains("block$id$_double_i1"));
    }

    #[test]
    fn test_load_rejects_undeclared_port_type() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"port_types": [], "blocks": [{{"kind":"x","label":"X","language":"c","out_ports":[{{"type":"double","name":"o"}}]}}]}}"#
        )
        .unwrap();
        let path = Utf8PathBuf::from_path_buf(file.path().to_path_buf()).unwrap();
        let err = BlockCatalog::load(&path).unwrap_err();
        assert!(err.to_string().contains("undeclared port type"));
    }

    #[test]
    fn test_load_catalog_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"port_types": [{{"type":"float","multiple":true}}],
                "blocks": [{{"kind":"mix","label":"Mix","language":"c",
                             "in_ports":[{{"type":"float","name":"i"}}]}}]}}"#
        )
        .unwrap();
        let path = Utf8PathBuf::from_path_buf(file.path().to_path_buf()).unwrap();
        let catalog = BlockCatalog::load(&path).unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.port_types().accepts_multiple("float"));
    }
}
