//! Layout engine: sizes and 1-based positions for every field in a forest.
//!
//! Sizes are computed bottom-up. Positions are assigned in a single
//! left-to-right scan of each sibling group, depth first. A field that
//! REDEFINES an earlier sibling replaces that sibling's size contribution
//! and reuses its recorded position without advancing the running cursors.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, trace};

use crate::error::BuildError;
use crate::model::{FieldId, Forest};

/// Position and size of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Placement {
    /// 1-based offset within the parent's sibling group.
    pub local_start: usize,
    /// 1-based offset within the whole record.
    pub global_start: usize,
    /// Total characters occupied, including all occurrences.
    pub size: usize,
}

impl Placement {
    /// Last local position occupied (inclusive).
    pub fn local_end(&self) -> usize {
        (self.local_start + self.size).saturating_sub(1)
    }

    /// Last global position occupied (inclusive).
    pub fn global_end(&self) -> usize {
        (self.global_start + self.size).saturating_sub(1)
    }
}

/// Placements for every field of a forest, keyed by [`FieldId`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layout {
    placements: HashMap<FieldId, Placement>,
}

impl Layout {
    /// Placement of `id`, if the field was laid out.
    pub fn get(&self, id: FieldId) -> Option<&Placement> {
        self.placements.get(&id)
    }

    /// Placement of `id`, or [`BuildError::Internal`] if it is missing.
    pub fn placement(&self, id: FieldId) -> Result<Placement, BuildError> {
        self.placements.get(&id).copied().ok_or_else(|| {
            BuildError::internal(format!("no placement recorded for field #{}", id.index()))
        })
    }

    /// Number of fields laid out.
    pub fn len(&self) -> usize {
        self.placements.len()
    }

    /// Whether nothing was laid out.
    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }
}

/// Compute sizes and positions for every field in `forest`.
///
/// Roots are scanned like one sibling group: the local cursor runs on from
/// one record to the next, while every record starts at global position 1.
pub fn compute_layout(forest: &Forest) -> Result<Layout, BuildError> {
    let mut engine = Engine {
        forest,
        sizes: HashMap::with_capacity(forest.len()),
        placements: HashMap::with_capacity(forest.len()),
    };
    let mut cursor = Cursor::at(1);
    for &root in forest.roots() {
        cursor.global = 1;
        let size = engine.size_of(root)?;
        debug!(root = %forest[root].name, size, local_start = cursor.local, "laying out record");
        engine.place(root, &mut cursor)?;
    }
    Ok(Layout {
        placements: engine.placements,
    })
}

/// Running positions of the next free byte in a sibling scan.
struct Cursor {
    local: usize,
    global: usize,
}

impl Cursor {
    fn at(global: usize) -> Self {
        Self { local: 1, global }
    }
}

struct Engine<'a> {
    forest: &'a Forest,
    sizes: HashMap<FieldId, usize>,
    placements: HashMap<FieldId, Placement>,
}

impl Engine<'_> {
    fn size_of(&mut self, id: FieldId) -> Result<usize, BuildError> {
        if let Some(&size) = self.sizes.get(&id) {
            return Ok(size);
        }
        let forest = self.forest;
        let field = &forest[id];
        let overflow = || BuildError::SizeOverflow {
            field: field.name.clone(),
        };
        let single = match &field.picture {
            Some(picture) => picture.width,
            None => {
                // One slot per storage area; a redefining child overwrites
                // the slot of the field it aliases.
                let mut slots: Vec<usize> = Vec::with_capacity(field.children.len());
                let mut slot_of: HashMap<FieldId, usize> = HashMap::new();
                for &child in &field.children {
                    let size = self.size_of(child)?;
                    let slot = match forest[child].redefines_target() {
                        Some(target) => {
                            let slot = *slot_of.get(&target).ok_or_else(|| {
                                BuildError::internal(format!(
                                    "size contribution for {} not recorded before {} redefines it",
                                    forest[target].name, forest[child].name
                                ))
                            })?;
                            slots[slot] = size;
                            slot
                        }
                        None => {
                            slots.push(size);
                            slots.len() - 1
                        }
                    };
                    slot_of.insert(child, slot);
                }
                slots
                    .iter()
                    .try_fold(0usize, |total, &size| total.checked_add(size))
                    .ok_or_else(overflow)?
            }
        };
        let size = single
            .checked_mul(field.occurs_count())
            .ok_or_else(overflow)?;
        self.sizes.insert(id, size);
        Ok(size)
    }

    fn place_scope(&mut self, ids: &[FieldId], global_origin: usize) -> Result<(), BuildError> {
        let mut cursor = Cursor::at(global_origin);
        for &id in ids {
            self.place(id, &mut cursor)?;
        }
        Ok(())
    }

    /// Place `id` and its subtree, advancing `cursor` unless `id` redefines.
    fn place(&mut self, id: FieldId, cursor: &mut Cursor) -> Result<(), BuildError> {
        let forest = self.forest;
        let size = self.size_of(id)?;
        let field = &forest[id];
        let (local_start, global_start) = match field.redefines_target() {
            Some(target) => {
                let at = self.placements.get(&target).ok_or_else(|| {
                    BuildError::internal(format!(
                        "position of {} not recorded before {} redefines it",
                        forest[target].name, field.name
                    ))
                })?;
                (at.local_start, at.global_start)
            }
            None => {
                let at = (cursor.local, cursor.global);
                let overflow = || BuildError::SizeOverflow {
                    field: field.name.clone(),
                };
                cursor.local = cursor.local.checked_add(size).ok_or_else(overflow)?;
                cursor.global = cursor.global.checked_add(size).ok_or_else(overflow)?;
                at
            }
        };
        let placement = Placement {
            local_start,
            global_start,
            size,
        };
        trace!(
            field = %field.name,
            local_start,
            global_start,
            size,
            "placed"
        );
        self.placements.insert(id, placement);
        if !field.children.is_empty() {
            self.place_scope(&field.children, global_start)?;
        }
        Ok(())
    }
}

// ── Reports ─────────────────────────────────────────────────────────────

/// One line of a flattened layout report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayoutRow {
    /// Nesting depth; roots are 0.
    pub depth: usize,
    /// Level number as declared.
    pub level: u32,
    /// Identifier (after filler rewriting).
    pub name: String,
    /// Raw picture string for leaves.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    /// OCCURS count, if declared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occurs: Option<u32>,
    /// Identifier of the redefined sibling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redefines: Option<String>,
    /// See [`Placement::local_start`].
    pub local_start: usize,
    /// See [`Placement::local_end`].
    pub local_end: usize,
    /// See [`Placement::global_start`].
    pub global_start: usize,
    /// See [`Placement::global_end`].
    pub global_end: usize,
    /// See [`Placement::size`].
    pub size: usize,
}

/// Flatten a laid-out forest into report rows, in pre-order.
pub fn layout_rows(forest: &Forest, layout: &Layout) -> Result<Vec<LayoutRow>, BuildError> {
    let mut rows = Vec::with_capacity(forest.len());
    let mut stack: Vec<(FieldId, usize)> = forest.roots().iter().rev().map(|&id| (id, 0)).collect();
    while let Some((id, depth)) = stack.pop() {
        let field = &forest[id];
        let placement = layout.placement(id)?;
        rows.push(LayoutRow {
            depth,
            level: field.level,
            name: field.name.clone(),
            picture: field.picture.as_ref().map(|p| p.raw.clone()),
            occurs: field.occurs,
            redefines: field.redefines.clone(),
            local_start: placement.local_start,
            local_end: placement.local_end(),
            global_start: placement.global_start,
            global_end: placement.global_end(),
            size: placement.size,
        });
        stack.extend(field.children.iter().rev().map(|&child| (child, depth + 1)));
    }
    Ok(rows)
}
