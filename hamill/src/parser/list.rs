use crate::document::{ElementList, Inline, ListKind, Node};
use crate::parser::error::ParseErrorKind;

type Handle = usize;

enum Entry {
    List {
        kind: ListKind,
        parent: Option<Handle>,
        children: Vec<Handle>,
    },
    /// An item that owns a nested list: its text line, then the list.
    Composite { parent: Handle, children: Vec<Handle> },
    Item(Vec<Inline>),
}

/// Builds one list tree from consecutive list items.
///
/// Entries live in an arena and refer to each other by handle, parents
/// included, so the tree can be walked upward while it is still growing.
pub struct ListBuilder {
    arena: Vec<Entry>,
    active: Handle,
    depth: usize,
    start: usize,
}

impl ListBuilder {
    /// Start a list whose first item sits at `level`. That level becomes
    /// depth one; later items are measured relative to it.
    pub fn new(kind: ListKind, level: usize) -> Self {
        ListBuilder {
            arena: vec![Entry::List {
                kind,
                parent: None,
                children: Vec::new(),
            }],
            active: 0,
            depth: 1,
            start: level,
        }
    }

    pub fn push(
        &mut self,
        kind: ListKind,
        level: usize,
        content: Vec<Inline>,
    ) -> Result<(), ParseErrorKind> {
        if level < self.start {
            return Err(ParseErrorKind::ListBelowStart {
                level,
                start: self.start,
            });
        }
        let depth = level - self.start + 1;

        while self.depth < depth {
            self.descend(kind)?;
        }
        while self.depth > depth {
            self.ascend()?;
        }

        let active_kind = self.active_kind();
        if active_kind != kind {
            return Err(ParseErrorKind::IncoherentListKind {
                expected: active_kind,
                found: kind,
            });
        }

        let item = self.alloc(Entry::Item(content));
        self.children_mut(self.active).push(item);
        Ok(())
    }

    /// Wrap the active list's last item in a composite that also holds a
    /// new, empty sub-list, and make that sub-list active.
    fn descend(&mut self, kind: ListKind) -> Result<(), ParseErrorKind> {
        let last = self
            .children_mut(self.active)
            .pop()
            .ok_or(ParseErrorKind::OrphanSublist)?;
        let composite = self.alloc(Entry::Composite {
            parent: self.active,
            children: vec![last],
        });
        let sublist = self.alloc(Entry::List {
            kind,
            parent: Some(composite),
            children: Vec::new(),
        });
        self.children_mut(composite).push(sublist);
        self.children_mut(self.active).push(composite);
        self.active = sublist;
        self.depth += 1;
        Ok(())
    }

    fn ascend(&mut self) -> Result<(), ParseErrorKind> {
        let parent = match &self.arena[self.active] {
            Entry::List { parent, .. } => *parent,
            _ => None,
        };
        let list = match parent.map(|p| (p, &self.arena[p])) {
            Some((_, Entry::Composite { parent, .. })) => *parent,
            Some((p, Entry::List { .. })) => p,
            _ => return Err(ParseErrorKind::ListAscent),
        };
        if !matches!(self.arena[list], Entry::List { .. }) {
            return Err(ParseErrorKind::ListAscent);
        }
        self.active = list;
        self.depth -= 1;
        Ok(())
    }

    fn alloc(&mut self, entry: Entry) -> Handle {
        self.arena.push(entry);
        self.arena.len() - 1
    }

    fn active_kind(&self) -> ListKind {
        match &self.arena[self.active] {
            Entry::List { kind, .. } => *kind,
            _ => unreachable!("the active entry is always a list"),
        }
    }

    fn children_mut(&mut self, handle: Handle) -> &mut Vec<Handle> {
        match &mut self.arena[handle] {
            Entry::List { children, .. } | Entry::Composite { children, .. } => children,
            Entry::Item(_) => unreachable!("list items have no children"),
        }
    }

    /// Turn the arena into an owned tree rooted at the first list.
    pub fn finish(mut self) -> ElementList {
        match self.take(0) {
            Node::List(list) => list,
            _ => unreachable!("the root entry is always a list"),
        }
    }

    fn take(&mut self, handle: Handle) -> Node {
        match std::mem::replace(&mut self.arena[handle], Entry::Item(Vec::new())) {
            Entry::List { kind, children, .. } => Node::List(ElementList {
                kind,
                items: children.into_iter().map(|h| self.take(h)).collect(),
            }),
            Entry::Composite { children, .. } => {
                Node::Composite(children.into_iter().map(|h| self.take(h)).collect())
            }
            Entry::Item(content) => Node::TextLine(content),
        }
    }
}
