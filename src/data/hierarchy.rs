// ============================================================
// Layer 4 — Hierarchy Loader
// ============================================================
// Reads the label taxonomy and produces the ordered list of
// internal nodes every tree model is sized from.
//
// Two inputs:
//   wnids.txt — one leaf wnid per line; the line number is the
//               dataset label index of that class
//   tree.xml  — nested elements carrying a `wnid` attribute
//
//   <tree>
//     <synset wnid="root">
//       <synset wnid="vehicle">
//         <synset wnid="airplane"/>
//         <synset wnid="ship"/>
//       </synset>
//       <synset wnid="cat"/>
//     </synset>
//   </tree>
//
// Elements without a `wnid` are transparent: their children attach
// to the nearest ancestor that has one. Every element with at least
// one child becomes a Node, in document (pre-order) order.
//
// Reference: quick-xml crate documentation
//            Rust Book §9 (Error Handling)

use std::{collections::HashMap, fs, path::{Path, PathBuf}};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};

use crate::domain::node::Node;

/// Failures while reading the taxonomy files.
#[derive(Debug, thiserror::Error)]
pub enum HierarchyError {
    #[error("cannot read '{path}': {source}")]
    Io {
        path:   PathBuf,
        source: std::io::Error,
    },

    #[error("malformed hierarchy XML: {0}")]
    Xml(String),

    #[error("leaf '{0}' is not listed in the wnid file")]
    UnknownLeaf(String),

    #[error("hierarchy has no internal nodes")]
    Empty,
}

pub type Result<T> = std::result::Result<T, HierarchyError>;

/// Locations of the taxonomy files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyPaths {
    pub tree:  PathBuf,
    pub wnids: PathBuf,
}

impl Default for HierarchyPaths {
    fn default() -> Self {
        Self {
            tree:  PathBuf::from("./data/cifar10/tree.xml"),
            wnids: PathBuf::from("./data/cifar10/wnids.txt"),
        }
    }
}

impl HierarchyPaths {
    pub fn new(tree: impl Into<PathBuf>, wnids: impl Into<PathBuf>) -> Self {
        Self { tree: tree.into(), wnids: wnids.into() }
    }

    pub fn load(&self) -> Result<Vec<Node>> {
        get_nodes(&self.tree, &self.wnids)
    }
}

/// Raw element as it appears in the XML, before transparent
/// containers are collapsed.
#[derive(Debug, Default)]
struct Element {
    wnid:     Option<String>,
    children: Vec<Element>,
}

/// A taxonomy entry after collapsing wnid-less containers.
#[derive(Debug)]
struct Entry {
    wnid:     String,
    children: Vec<Entry>,
}

/// Load the internal nodes of the hierarchy at `tree_path`, labelling
/// leaves by their position in `wnids_path`.
pub fn get_nodes(tree_path: impl AsRef<Path>, wnids_path: impl AsRef<Path>) -> Result<Vec<Node>> {
    let tree_path = tree_path.as_ref();
    let wnids = read_wnids(wnids_path)?;
    let xml = fs::read_to_string(tree_path).map_err(|source| HierarchyError::Io {
        path: tree_path.to_path_buf(),
        source,
    })?;

    let nodes = parse_tree(&xml, &wnids)?;
    tracing::debug!(
        "Loaded {} nodes ({} leaves) from '{}'",
        nodes.len(),
        wnids.len(),
        tree_path.display()
    );
    Ok(nodes)
}

/// Total feature width contributed by `nodes`: the sum of their class counts.
pub fn dim(nodes: &[Node]) -> usize {
    nodes.iter().map(Node::num_classes).sum()
}

/// Read the leaf wnid list. Blank lines are skipped.
pub fn read_wnids(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| HierarchyError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Parse hierarchy XML into its internal nodes.
pub fn parse_tree(xml: &str, wnids: &[String]) -> Result<Vec<Node>> {
    let root = parse_elements(xml)?;
    let entries = collapse(root);

    let labels: HashMap<&str, usize> = wnids
        .iter()
        .enumerate()
        .map(|(index, wnid)| (wnid.as_str(), index))
        .collect();

    let mut nodes = Vec::new();
    for entry in &entries {
        collect_nodes(entry, &labels, &mut nodes)?;
    }

    if nodes.is_empty() {
        return Err(HierarchyError::Empty);
    }
    Ok(nodes)
}

fn parse_elements(xml: &str) -> Result<Element> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    // stack[0] is a synthetic root holding the top-level elements
    let mut stack = vec![Element::default()];
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                stack.push(Element { wnid: wnid_attribute(e), children: Vec::new() });
            }
            Ok(Event::Empty(ref e)) => {
                let leaf = Element { wnid: wnid_attribute(e), children: Vec::new() };
                attach(&mut stack, leaf)?;
            }
            Ok(Event::End(_)) => {
                let finished = stack
                    .pop()
                    .ok_or_else(|| HierarchyError::Xml("unbalanced closing tag".into()))?;
                attach(&mut stack, finished)?;
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(HierarchyError::Xml(e.to_string())),
        }
        buf.clear();
    }

    match (stack.pop(), stack.is_empty()) {
        (Some(root), true) => Ok(root),
        _ => Err(HierarchyError::Xml("unclosed element at end of document".into())),
    }
}

fn attach(stack: &mut [Element], element: Element) -> Result<()> {
    let parent = stack
        .last_mut()
        .ok_or_else(|| HierarchyError::Xml("unbalanced closing tag".into()))?;
    parent.children.push(element);
    Ok(())
}

fn wnid_attribute(e: &BytesStart) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == b"wnid")
        .and_then(|attr| String::from_utf8(attr.value.to_vec()).ok())
}

/// Drop wnid-less containers, lifting their children one level up.
fn collapse(element: Element) -> Vec<Entry> {
    let children: Vec<Entry> = element.children.into_iter().flat_map(collapse).collect();
    match element.wnid {
        Some(wnid) => vec![Entry { wnid, children }],
        None       => children,
    }
}

fn collect_nodes(entry: &Entry, labels: &HashMap<&str, usize>, nodes: &mut Vec<Node>) -> Result<()> {
    if entry.children.is_empty() {
        return Ok(());
    }

    let children = entry.children.iter().map(|child| child.wnid.clone()).collect();
    let classes = entry
        .children
        .iter()
        .map(|child| leaves_under(child, labels))
        .collect::<Result<Vec<_>>>()?;
    nodes.push(Node::new(entry.wnid.clone(), children, classes));

    for child in &entry.children {
        collect_nodes(child, labels, nodes)?;
    }
    Ok(())
}

fn leaves_under(entry: &Entry, labels: &HashMap<&str, usize>) -> Result<Vec<usize>> {
    if entry.children.is_empty() {
        return labels
            .get(entry.wnid.as_str())
            .map(|&label| vec![label])
            .ok_or_else(|| HierarchyError::UnknownLeaf(entry.wnid.clone()));
    }

    let mut leaves = Vec::new();
    for child in &entry.children {
        leaves.extend(leaves_under(child, labels)?);
    }
    leaves.sort_unstable();
    leaves.dedup();
    Ok(leaves)
}
