use std::fmt;
use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use pqlens_error::{ErrorKind, PqError, Result};

use crate::basic::{ConvertedType, LogicalType, Repetition, Type};
use crate::format::SchemaElement;

/// Guards against absurd nesting in corrupt schemas.
const MAX_SCHEMA_DEPTH: usize = 1024;

/// Names from the root (exclusive) to a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnPath {
    parts: Vec<String>,
}

impl ColumnPath {
    pub fn new(parts: Vec<String>) -> Self {
        ColumnPath { parts }
    }

    /// Parse a dot separated path, e.g. "a.b.c".
    pub fn from_dotted(s: &str) -> Self {
        ColumnPath {
            parts: s.split('.').map(|p| p.to_string()).collect(),
        }
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }
}

impl fmt::Display for ColumnPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.parts.join("."))
    }
}

impl From<Vec<String>> for ColumnPath {
    fn from(parts: Vec<String>) -> Self {
        ColumnPath { parts }
    }
}

impl From<&str> for ColumnPath {
    fn from(s: &str) -> Self {
        ColumnPath::from_dotted(s)
    }
}

/// Index of a node in the schema arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Group {
        children: Vec<NodeId>,
    },
    Leaf {
        physical_type: Type,
        type_length: i32,
        /// Position in the depth-first leaf enumeration.
        column_idx: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    /// Name as written in the file. The root's name is informational only and
    /// isn't part of any column path.
    pub name: String,
    pub repetition: Repetition,
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub logical_type: Option<LogicalType>,
    pub converted_type: ConvertedType,
    pub precision: i32,
    pub scale: i32,
    pub field_id: Option<i32>,
    /// Definition level reached when this node is present.
    pub def_level: i16,
    /// Repetition level of this node.
    pub rep_level: i16,
}

/// Describes a leaf column.
///
/// Levels are computed once when the schema is built.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    pub path: ColumnPath,
    pub node: NodeId,
    pub physical_type: Type,
    pub type_length: i32,
    pub logical_type: Option<LogicalType>,
    pub converted_type: ConvertedType,
    pub precision: i32,
    pub scale: i32,
    pub max_def_level: i16,
    pub max_rep_level: i16,
}

impl ColumnDescriptor {
    pub fn physical_type(&self) -> Type {
        self.physical_type
    }

    /// If a value with this definition level is absent.
    pub fn is_null_level(&self, def_level: i16) -> bool {
        def_level < self.max_def_level
    }
}

/// The schema tree of a file, stored as an arena.
///
/// Node 0 is always the root group.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDescriptor {
    nodes: Vec<SchemaNode>,
    leaves: Vec<Arc<ColumnDescriptor>>,
    leaf_by_path: HashMap<ColumnPath, usize>,
}

/// A group whose children are still being read.
#[derive(Debug)]
struct GroupFrame<'a> {
    id: NodeId,
    remaining: usize,
    /// Names of the children seen so far.
    names: HashSet<&'a str>,
}

impl GroupFrame<'_> {
    fn new(id: NodeId, num_children: usize) -> Self {
        GroupFrame {
            id,
            remaining: num_children,
            names: HashSet::with_capacity(num_children.min(1024)),
        }
    }
}

impl SchemaDescriptor {
    /// Rebuild the tree from the flattened pre-order element list.
    ///
    /// Each group declares its number of children, children follow their
    /// parent immediately.
    pub fn try_from_elements(elements: &[SchemaElement]) -> Result<Self> {
        let root_el = elements
            .first()
            .ok_or_else(|| PqError::new(ErrorKind::CorruptSchema, "Schema is empty"))?;

        let root_children = match root_el.num_children {
            Some(n) if n >= 0 && root_el.type_.is_none() => n as usize,
            _ => {
                return Err(PqError::new(
                    ErrorKind::CorruptSchema,
                    "Schema root must be a group",
                ));
            }
        };

        let mut schema = SchemaDescriptor {
            nodes: Vec::with_capacity(elements.len()),
            leaves: Vec::new(),
            leaf_by_path: HashMap::new(),
        };
        schema.nodes.push(SchemaNode {
            name: root_el.name.clone(),
            repetition: Repetition::REQUIRED,
            kind: NodeKind::Group {
                children: Vec::with_capacity(root_children.min(1024)),
            },
            parent: None,
            logical_type: root_el.logical_type,
            converted_type: ConvertedType::from_thrift(root_el.converted_type),
            precision: 0,
            scale: 0,
            field_id: root_el.field_id,
            def_level: 0,
            rep_level: 0,
        });

        let mut stack = vec![GroupFrame::new(NodeId(0), root_children)];
        let mut idx = 1;

        while let Some(frame) = stack.last_mut() {
            if frame.remaining == 0 {
                stack.pop();
                continue;
            }
            frame.remaining -= 1;
            let parent = frame.id;

            let el = elements.get(idx).ok_or_else(|| {
                PqError::new(
                    ErrorKind::CorruptSchema,
                    "Group declares more children than there are schema elements",
                )
                .with_field("group", &schema.nodes[parent.0].name)
            })?;
            idx += 1;

            if !frame.names.insert(el.name.as_str()) {
                return Err(
                    PqError::new(ErrorKind::CorruptSchema, "Duplicate field name within group")
                        .with_field("name", &el.name),
                );
            }

            let (id, num_children) = schema.push_node(parent, el)?;
            if num_children > 0 {
                if stack.len() >= MAX_SCHEMA_DEPTH {
                    return Err(PqError::new(ErrorKind::CorruptSchema, "Schema nested too deeply"));
                }
                stack.push(GroupFrame::new(id, num_children));
            }
        }

        if idx != elements.len() {
            return Err(PqError::new(
                ErrorKind::CorruptSchema,
                "Trailing schema elements not reachable from the root",
            )
            .with_field("reachable", idx)
            .with_field("total", elements.len()));
        }

        Ok(schema)
    }

    /// Create a node for `el` under `parent`.
    ///
    /// Returns the new node's id and the number of children it declares.
    fn push_node(&mut self, parent: NodeId, el: &SchemaElement) -> Result<(NodeId, usize)> {
        let repetition = match el.repetition_type {
            Some(code) => Repetition::try_from_thrift(code)?,
            None => {
                return Err(PqError::new(
                    ErrorKind::CorruptSchema,
                    "Schema element is missing a repetition",
                )
                .with_field("name", &el.name));
            }
        };

        let parent_node = &self.nodes[parent.0];
        let (mut def_level, mut rep_level) = (parent_node.def_level, parent_node.rep_level);
        match repetition {
            Repetition::REQUIRED => (),
            Repetition::OPTIONAL => def_level += 1,
            Repetition::REPEATED => {
                def_level += 1;
                rep_level += 1;
            }
        }

        let id = NodeId(self.nodes.len());
        let converted_type = ConvertedType::from_thrift(el.converted_type);
        let precision = el.precision.unwrap_or(0);
        let scale = el.scale.unwrap_or(0);
        let logical_type = el
            .logical_type
            .or_else(|| LogicalType::from_converted(converted_type, scale, precision));

        let mut num_children = 0;
        let kind = match (el.type_, el.num_children) {
            (Some(code), None | Some(0)) => {
                let physical_type = Type::try_from_thrift(code)?;
                let type_length = el.type_length.unwrap_or(-1);
                if physical_type == Type::FIXED_LEN_BYTE_ARRAY && type_length <= 0 {
                    return Err(PqError::new(
                        ErrorKind::CorruptSchema,
                        "FIXED_LEN_BYTE_ARRAY requires a positive type length",
                    )
                    .with_field("name", &el.name));
                }
                NodeKind::Leaf {
                    physical_type,
                    type_length,
                    column_idx: self.leaves.len(),
                }
            }
            (None, Some(n)) if n > 0 => {
                num_children = n as usize;
                NodeKind::Group {
                    children: Vec::with_capacity(num_children.min(1024)),
                }
            }
            _ => {
                return Err(PqError::new(
                    ErrorKind::CorruptSchema,
                    "Schema element is neither a valid group nor a valid leaf",
                )
                .with_field("name", &el.name)
                .with_field("num_children", format!("{:?}", el.num_children)));
            }
        };

        let siblings = match &mut self.nodes[parent.0].kind {
            NodeKind::Group { children } => children,
            NodeKind::Leaf { .. } => {
                return Err(PqError::new(ErrorKind::CorruptSchema, "Leaf has children"));
            }
        };
        siblings.push(id);

        self.nodes.push(SchemaNode {
            name: el.name.clone(),
            repetition,
            kind,
            parent: Some(parent),
            logical_type,
            converted_type,
            precision,
            scale,
            field_id: el.field_id,
            def_level,
            rep_level,
        });

        if let NodeKind::Leaf {
            physical_type,
            type_length,
            column_idx,
        } = self.nodes[id.0].kind
        {
            let path = self.path_of(id);
            if self.leaf_by_path.contains_key(&path) {
                return Err(PqError::new(ErrorKind::CorruptSchema, "Duplicate column path")
                    .with_field("path", &path));
            }
            self.leaf_by_path.insert(path.clone(), column_idx);
            self.leaves.push(Arc::new(ColumnDescriptor {
                path,
                node: id,
                physical_type,
                type_length,
                logical_type,
                converted_type,
                precision,
                scale,
                max_def_level: def_level,
                max_rep_level: rep_level,
            }));
        }

        Ok((id, num_children))
    }

    fn path_of(&self, id: NodeId) -> ColumnPath {
        let mut parts = Vec::new();
        let mut curr = Some(id);
        while let Some(node_id) = curr {
            let node = &self.nodes[node_id.0];
            if node.parent.is_none() {
                break;
            }
            parts.push(node.name.clone());
            curr = node.parent;
        }
        parts.reverse();
        ColumnPath::new(parts)
    }

    pub fn root(&self) -> NodeRef<'_> {
        NodeRef {
            schema: self,
            id: NodeId(0),
        }
    }

    pub fn node(&self, id: NodeId) -> Option<NodeRef<'_>> {
        if id.0 < self.nodes.len() {
            Some(NodeRef { schema: self, id })
        } else {
            None
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_columns(&self) -> usize {
        self.leaves.len()
    }

    /// Leaf columns in depth-first order.
    pub fn columns(&self) -> &[Arc<ColumnDescriptor>] {
        &self.leaves
    }

    pub fn column(&self, idx: usize) -> Result<&Arc<ColumnDescriptor>> {
        self.leaves.get(idx).ok_or_else(|| {
            PqError::new(ErrorKind::IndexOutOfRange, "Column index out of range")
                .with_field("index", idx)
                .with_field("num_columns", self.leaves.len())
        })
    }

    /// Position of the leaf with the given path.
    pub fn column_index_of(&self, path: &ColumnPath) -> Result<usize> {
        self.leaf_by_path.get(path).copied().ok_or_else(|| {
            PqError::new(ErrorKind::ColumnNotFound, "Path does not resolve to a leaf column")
                .with_field("path", path)
        })
    }
}

/// Borrowed view of a node in the schema arena.
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    schema: &'a SchemaDescriptor,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    fn node(&self) -> &'a SchemaNode {
        &self.schema.nodes[self.id.0]
    }

    /// Name of the node. `None` for the root.
    pub fn name(&self) -> Option<&'a str> {
        let node = self.node();
        node.parent.map(|_| node.name.as_str())
    }

    /// Name as written in the file, including for the root.
    pub fn raw_name(&self) -> &'a str {
        &self.node().name
    }

    pub fn repetition(&self) -> Repetition {
        self.node().repetition
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.node().kind, NodeKind::Leaf { .. })
    }

    pub fn is_root(&self) -> bool {
        self.node().parent.is_none()
    }

    pub fn physical_type(&self) -> Option<Type> {
        match self.node().kind {
            NodeKind::Leaf { physical_type, .. } => Some(physical_type),
            NodeKind::Group { .. } => None,
        }
    }

    pub fn logical_type(&self) -> Option<LogicalType> {
        self.node().logical_type
    }

    pub fn converted_type(&self) -> ConvertedType {
        self.node().converted_type
    }

    pub fn def_level(&self) -> i16 {
        self.node().def_level
    }

    pub fn rep_level(&self) -> i16 {
        self.node().rep_level
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.node().parent.map(|id| NodeRef {
            schema: self.schema,
            id,
        })
    }

    pub fn children(&self) -> impl ExactSizeIterator<Item = NodeRef<'a>> + 'a {
        let schema = self.schema;
        let children: &'a [NodeId] = match &self.node().kind {
            NodeKind::Group { children } => children,
            NodeKind::Leaf { .. } => &[],
        };
        children.iter().map(move |&id| NodeRef { schema, id })
    }

    /// Descriptor for this node if it's a leaf.
    pub fn column(&self) -> Option<&'a Arc<ColumnDescriptor>> {
        match self.node().kind {
            NodeKind::Leaf { column_idx, .. } => self.schema.leaves.get(column_idx),
            NodeKind::Group { .. } => None,
        }
    }

    pub fn path(&self) -> ColumnPath {
        self.schema.path_of(self.id)
    }
}
