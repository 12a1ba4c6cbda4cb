//! KGML loader.
//!
//! Reads a KEGG Markup Language pathway into a [`Pathway`]:
//!
//! - `entry` elements become nodes, except `map` links and `group`
//!   containers. Group entries become [`Group`]s built from their
//!   `component` children.
//! - `relation` elements become transitions. The first `subtype` names the
//!   relation kind, which is `undefined` when absent.
//! - Relations touching an id above the placeholder threshold are dropped
//!   before resolution. In KGML exports these ids point at synthetic
//!   "undefined" entries that never become nodes.
//!
//! Loading is all-or-nothing: any malformed attribute or dangling reference
//! aborts with an error and no partial pathway.

use crate::error::{PathwayError, Result};
use crate::group::Group;
use crate::node::{LayoutBox, Node, NodeId, NodeKind};
use crate::pathway::{Pathway, PathwayMeta};
use crate::transition::{RelationKind, Transition};
use roxmltree::{Document, Node as XmlNode, ParsingOptions};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info};

/// Relations referencing ids above this value are discarded.
pub const DEFAULT_PLACEHOLDER_THRESHOLD: u32 = 190;

/// Entry types that are never places in the net.
const NON_NODE_ENTRY_TYPES: [&str; 2] = ["map", "group"];

/// Configurable KGML loader.
#[derive(Debug, Clone)]
pub struct KgmlLoader {
    placeholder_threshold: u32,
}

impl Default for KgmlLoader {
    fn default() -> Self {
        Self {
            placeholder_threshold: DEFAULT_PLACEHOLDER_THRESHOLD,
        }
    }
}

impl KgmlLoader {
    /// Creates a loader with the default placeholder threshold.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the id above which relations are discarded.
    pub fn with_placeholder_threshold(mut self, threshold: u32) -> Self {
        self.placeholder_threshold = threshold;
        self
    }

    /// Loads a KGML file.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Pathway> {
        let path = path.as_ref();
        let xml = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => PathwayError::FileNotFound(path.to_path_buf()),
            _ => PathwayError::Io {
                path: path.to_path_buf(),
                source: e,
            },
        })?;
        self.load_str(&xml, path.display().to_string())
    }

    /// Loads KGML from a string. `source` labels the pathway in errors and
    /// metadata.
    pub fn load_str(&self, xml: &str, source: impl Into<String>) -> Result<Pathway> {
        let source = source.into();
        // KGML exports carry a DOCTYPE
        let mut options = ParsingOptions::default();
        options.allow_dtd = true;
        let doc = Document::parse_with_options(xml, options)
            .map_err(|e| PathwayError::malformed(&source, e.to_string()))?;
        let root = doc.root_element();
        if !root.has_tag_name("pathway") {
            return Err(PathwayError::malformed(
                &source,
                format!("root element is <{}>, expected <pathway>", root.tag_name().name()),
            ));
        }

        let meta = PathwayMeta {
            source,
            name: root.attribute("name").map(str::to_string),
            org: root.attribute("org").map(str::to_string),
            number: root.attribute("number").map(str::to_string),
            title: root.attribute("title").map(str::to_string),
        };

        let nodes = extract_nodes(root)?;
        let (transitions, discarded) = self.extract_transitions(root)?;
        let groups = extract_groups(root)?;

        let pathway = Pathway::from_parts(meta, nodes, transitions, groups)?;
        info!(
            "Loaded {} ({}): {} nodes, {} transitions, {} groups, {} placeholder relations dropped",
            pathway.meta().name.as_deref().unwrap_or("unnamed pathway"),
            pathway.meta().source,
            pathway.node_count(),
            pathway.transitions().len(),
            pathway.groups().count(),
            discarded
        );
        Ok(pathway)
    }

    /// Returns the retained transitions and the number discarded.
    fn extract_transitions(&self, root: XmlNode<'_, '_>) -> Result<(Vec<Transition>, usize)> {
        let mut transitions = Vec::new();
        let mut discarded = 0;

        for relation in root.children().filter(|n| n.has_tag_name("relation")) {
            let from_id = parse_id(relation, "entry1", "relation")?;
            let to_id = parse_id(relation, "entry2", "relation")?;

            let threshold = self.placeholder_threshold;
            if from_id.get() > threshold || to_id.get() > threshold {
                debug!("Discarding placeholder relation {} -> {}", from_id, to_id);
                discarded += 1;
                continue;
            }

            let kind = relation
                .children()
                .find(|n| n.has_tag_name("subtype"))
                .and_then(|subtype| subtype.attribute("name"))
                .map(RelationKind::parse)
                .unwrap_or_default();

            transitions.push(Transition::new(from_id, to_id, kind));
        }
        Ok((transitions, discarded))
    }
}

impl Pathway {
    /// Loads a KGML file with the default loader.
    pub fn from_kgml_file(path: impl AsRef<Path>) -> Result<Self> {
        KgmlLoader::default().load_file(path)
    }

    /// Loads KGML text with the default loader.
    pub fn from_kgml_str(xml: &str, source: impl Into<String>) -> Result<Self> {
        KgmlLoader::default().load_str(xml, source)
    }
}

fn entries<'a, 'input>(root: XmlNode<'a, 'input>) -> impl Iterator<Item = XmlNode<'a, 'input>> {
    root.children().filter(|n| n.has_tag_name("entry"))
}

fn extract_nodes(root: XmlNode<'_, '_>) -> Result<Vec<Node>> {
    let mut nodes = Vec::new();
    for entry in entries(root) {
        let kind = entry.attribute("type").unwrap_or_default();
        if NON_NODE_ENTRY_TYPES.contains(&kind) {
            continue;
        }

        let id = parse_id(entry, "id", "entry")?;
        let context = format!("entry {}", id);
        let external_handle = required_attr(entry, "name", &context)?;
        let kind = required_attr(entry, "type", &context)?;
        let graphics = graphics_of(entry, &context)?;

        // Labels list synonyms ("TLR1, CD281, TIL, ..."); the first one names the node
        let display_name = graphics
            .attribute("name")
            .unwrap_or_default()
            .split(", ")
            .next()
            .unwrap_or_default();

        nodes.push(Node::new(
            id,
            external_handle,
            NodeKind::parse(kind),
            display_name,
            parse_layout(graphics, &context)?,
        ));
    }
    Ok(nodes)
}

fn extract_groups(root: XmlNode<'_, '_>) -> Result<Vec<Group>> {
    let mut groups = Vec::new();
    for entry in entries(root).filter(|e| e.attribute("type") == Some("group")) {
        let id = parse_id(entry, "id", "group entry")?;
        let context = format!("group {}", id);
        let graphics = graphics_of(entry, &context)?;

        let member_node_ids: BTreeSet<NodeId> = entry
            .children()
            .filter(|n| n.has_tag_name("component"))
            .map(|component| parse_id(component, "id", &context))
            .collect::<Result<_>>()?;

        groups.push(Group {
            id,
            display_name: entry.attribute("name").unwrap_or("undefined").to_string(),
            member_node_ids,
            layout: parse_layout(graphics, &context)?,
        });
    }
    Ok(groups)
}

fn required_attr<'a>(node: XmlNode<'a, '_>, attr: &str, context: &str) -> Result<&'a str> {
    node.attribute(attr)
        .ok_or_else(|| PathwayError::malformed(context, format!("missing attribute '{}'", attr)))
}

fn parse_id(node: XmlNode<'_, '_>, attr: &str, context: &str) -> Result<NodeId> {
    let raw = required_attr(node, attr, context)?;
    raw.parse().map_err(|_| {
        PathwayError::malformed(context, format!("'{}' is not a numeric id: {:?}", attr, raw))
    })
}

fn graphics_of<'a, 'input>(
    entry: XmlNode<'a, 'input>,
    context: &str,
) -> Result<XmlNode<'a, 'input>> {
    entry
        .children()
        .find(|n| n.has_tag_name("graphics"))
        .ok_or_else(|| PathwayError::malformed(context, "missing graphics block"))
}

fn parse_coord(graphics: XmlNode<'_, '_>, attr: &str, context: &str) -> Result<f64> {
    let raw = required_attr(graphics, attr, context)?;
    raw.trim().parse().map_err(|_| {
        let detail = format!("graphics '{}' is not a number: {:?}", attr, raw);
        PathwayError::malformed(context, detail)
    })
}

fn parse_layout(graphics: XmlNode<'_, '_>, context: &str) -> Result<LayoutBox> {
    Ok(LayoutBox::from_kgml(
        parse_coord(graphics, "x", context)?,
        parse_coord(graphics, "y", context)?,
        parse_coord(graphics, "width", context)?,
        parse_coord(graphics, "height", context)?,
    ))
}
