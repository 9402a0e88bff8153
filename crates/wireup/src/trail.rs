// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Per-thread record of the types currently being checked or built.
//!
//! Eligibility and construction recurse into parameter types. A type that shows up
//! again on its own trail is part of a cycle, which callers turn into "not eligible"
//! or a construction failure instead of recursing forever.

use std::any::TypeId;
use std::cell::RefCell;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    Eligibility,
    Construction,
}

thread_local! {
    static TRAIL: RefCell<Vec<(TypeId, Stage)>> = const { RefCell::new(Vec::new()) };
}

/// Removes its entry from the trail when dropped.
#[derive(Debug)]
pub(crate) struct Step {
    entry: (TypeId, Stage),
}

/// Records `id` at `stage`, or returns `None` if it is already on the trail at that stage.
pub(crate) fn enter(id: TypeId, stage: Stage) -> Option<Step> {
    let entry = (id, stage);

    TRAIL.with_borrow_mut(|trail| {
        if trail.contains(&entry) {
            return None;
        }
        trail.push(entry);
        Some(Step { entry })
    })
}

/// Whether `id` is currently on the trail at `stage`.
pub(crate) fn is_active(id: TypeId, stage: Stage) -> bool {
    TRAIL.with_borrow(|trail| trail.contains(&(id, stage)))
}

impl Drop for Step {
    fn drop(&mut self) {
        TRAIL.with_borrow_mut(|trail| {
            if let Some(position) = trail.iter().rposition(|entry| *entry == self.entry) {
                trail.remove(position);
            }
        });
    }
}
