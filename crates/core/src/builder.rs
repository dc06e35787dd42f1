//! Tree builder: turns a flat declaration sequence into a record forest.
//!
//! Declarations arrive in source order. The builder keeps a stack of open
//! groups; each incoming field closes every open group whose level is not
//! strictly below its own and then attaches to whatever remains on top.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::BuildError;
use crate::model::{Declaration, Field, FieldId, Forest};

/// Incremental builder for a [`Forest`].
#[derive(Debug)]
pub struct TreeBuilder {
    root_scope: String,
    forest: Forest,
    stack: Vec<FieldId>,
    fillers: HashMap<Option<FieldId>, usize>,
    generated: HashSet<FieldId>,
}

impl TreeBuilder {
    /// Start a new forest. `root_scope` names the copybook and prefixes
    /// level-01 fillers.
    pub fn new(root_scope: impl Into<String>) -> Self {
        Self {
            root_scope: root_scope.into(),
            forest: Forest::default(),
            stack: Vec::new(),
            fillers: HashMap::new(),
            generated: HashSet::new(),
        }
    }

    /// Interpret a declaration's clauses and attach the resulting field.
    pub fn add(&mut self, decl: Declaration) -> Result<FieldId, BuildError> {
        self.add_field(Field::from_declaration(decl)?)
    }

    /// Attach an already-constructed field.
    pub fn add_field(&mut self, mut field: Field) -> Result<FieldId, BuildError> {
        if field.level < 1 {
            return Err(BuildError::InvalidLevel {
                field: field.name,
                level: field.level,
            });
        }

        let parent = if field.level == 1 {
            self.stack.clear();
            None
        } else {
            while self
                .stack
                .last()
                .is_some_and(|&top| self.forest[top].level >= field.level)
            {
                self.stack.pop();
            }
            match self.stack.last() {
                Some(&top) => Some(top),
                None => {
                    return Err(BuildError::OrphanField {
                        field: field.name,
                        level: field.level,
                    });
                }
            }
        };

        let is_filler = field.is_filler();
        if is_filler {
            field.name = self.filler_name(parent);
        } else {
            self.yield_name(parent, &field.name);
        }

        if let Some(target) = field.redefines.as_deref() {
            let resolved = self.resolve_redefines(parent, field.level, target);
            match resolved {
                Some(id) => field.redefines_target = Some(id),
                None => {
                    return Err(BuildError::UnknownRedefinesTarget {
                        field: field.name,
                        target: target.to_string(),
                    });
                }
            }
        }

        debug!(
            level = field.level,
            name = %field.name,
            parent = ?parent.map(|p| self.forest[p].name.as_str()),
            leaf = field.is_leaf(),
            "attach field"
        );

        let is_group = field.is_group();
        let id = self.forest.push(field);
        if is_filler {
            self.generated.insert(id);
        }
        match parent {
            Some(p) => self.forest.attach(p, id),
            None => {
                self.forest.push_root(id);
            }
        }
        if is_group {
            self.stack.push(id);
        }
        Ok(id)
    }

    /// The forest built so far.
    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    /// Finish building. The open-group stack is discarded.
    pub fn finish(self) -> Forest {
        self.forest
    }

    /// Next `<scope>-FILLER<n>` not already taken by a sibling.
    fn filler_name(&mut self, parent: Option<FieldId>) -> String {
        let scope = match parent {
            Some(p) => self.forest[p].name.clone(),
            None => self.root_scope.clone(),
        };
        loop {
            let counter = self.fillers.entry(parent).or_insert(0);
            *counter += 1;
            let candidate = format!("{scope}-FILLER{counter}");
            if !self.sibling_named(parent, &candidate) {
                return candidate;
            }
        }
    }

    /// A declared field takes precedence over a generated filler name: the
    /// filler that holds `name` in this scope is renamed.
    fn yield_name(&mut self, parent: Option<FieldId>, name: &str) {
        let clash = self
            .siblings(parent)
            .iter()
            .copied()
            .find(|id| self.generated.contains(id) && self.forest[*id].name == name);
        if let Some(id) = clash {
            let renamed = self.filler_name(parent);
            debug!(from = name, to = %renamed, "renaming filler");
            self.forest.rename(id, renamed);
        }
    }

    fn sibling_named(&self, parent: Option<FieldId>, name: &str) -> bool {
        self.siblings(parent).iter().any(|&id| self.forest[id].name == name)
    }

    fn siblings(&self, parent: Option<FieldId>) -> &[FieldId] {
        match parent {
            Some(p) => self.forest[p].children.as_slice(),
            None => self.forest.roots(),
        }
    }

    /// Latest earlier sibling at `level` named `target`.
    fn resolve_redefines(&self, parent: Option<FieldId>, level: u32, target: &str) -> Option<FieldId> {
        self.siblings(parent).iter().rev().copied().find(|&id| {
            let sib = &self.forest[id];
            sib.level == level && sib.name == target
        })
    }
}

/// Build a forest from a complete declaration sequence.
pub fn build_forest<I>(root_scope: &str, declarations: I) -> Result<Forest, BuildError>
where
    I: IntoIterator<Item = Declaration>,
{
    let mut builder = TreeBuilder::new(root_scope);
    for decl in declarations {
        builder.add(decl)?;
    }
    Ok(builder.finish())
}
