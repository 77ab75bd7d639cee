//! Recursive initialization of a node tree.
//!
//! Per node: reset the record, run the subtype checks, initialize every child
//! of every slot in order, fold broken or missing children into the parent,
//! then enforce the declared child-count bounds. Problems surface bottom-up:
//! by the time a parent is judged, its children already carry their own
//! diagnostics.

use tracing::debug;

use crate::{
    CueflowError, Result,
    events::NodeEvent,
    node::{ChildSlot, Element, Health, MaxChildren},
    runtime::Context,
};

/// Initialize `element` and everything below it.
///
/// Returns an error only for programmer-invariant violations, which abort the
/// whole initialization.
pub fn init(
    element: &dyn Element,
    ctx: &Context,
) -> Result<()> {
    element.record().reset();
    element.validate(ctx);

    let slots = element.slots();
    for slot in &slots {
        check_single_slot(element, slot)?;

        for child in &slot.children {
            match child {
                Some(child) => {
                    init(*child, ctx)?;
                    if child.record().health() == Health::Broken {
                        element.mark_broken(format!("contained {} '{}' is broken", slot.child_type, child.name()));
                    }
                }
                None => element.mark_broken(format!("contained {} is not defined", slot.child_type)),
            }
        }
    }

    for slot in &slots {
        let count = slot.count();
        if slot.arity.below_min(count) {
            element.mark_broken(format!("{} '{}' needs at least one {}", element.type_name(), element.name(), slot.child_type));
        } else if slot.arity.above_max(count) {
            element.mark_broken(format!("{} '{}' cannot contain any {}", element.type_name(), element.name(), slot.child_type));
        }
    }

    ctx.increment_init_count();
    publish_health(element, ctx);
    Ok(())
}

/// Initialize every root in order, then check that each element was
/// initialized exactly once.
///
/// Returns the number of initialized elements. A count that differs from the
/// precomputed total is an invariant violation.
pub fn init_roots<'a>(
    roots: impl IntoIterator<Item = &'a dyn Element>,
    ctx: &Context,
    owner: &str,
) -> Result<usize> {
    ctx.reset_init_count();

    let mut expected = 0;
    for root in roots {
        expected += element_count(root);
        init(root, ctx)?;
    }

    let initialized = ctx.init_count();
    if initialized != expected {
        return Err(CueflowError::Invariant(format!("initialized {} of {} elements in {}", initialized, expected, owner)));
    }
    Ok(expected)
}

/// Count `element` and every node below it, i.e. how many `init()` calls a
/// full initialization performs.
pub fn element_count(element: &dyn Element) -> usize {
    1 + element.slots().iter().flat_map(|slot| slot.children.iter().flatten()).map(|child| element_count(*child)).sum::<usize>()
}

fn check_single_slot(
    element: &dyn Element,
    slot: &ChildSlot<'_>,
) -> Result<()> {
    if slot.arity.max == MaxChildren::One && slot.children.len() > 1 {
        return Err(CueflowError::Invariant(format!(
            "{} '{}' holds {} {} children in a single-child slot",
            element.type_name(),
            element.name(),
            slot.children.len(),
            slot.child_type
        )));
    }
    Ok(())
}

fn publish_health(
    element: &dyn Element,
    ctx: &Context,
) {
    let snapshot = element.record().snapshot();
    match snapshot.health {
        Health::Healthy => debug!(node = %element.id(), name = %element.name(), "initialized"),
        Health::Sick => {
            ctx.emit(element.id(), element.name(), NodeEvent::Sick(snapshot.unhealthy_reason.clone()));
            ctx.emit_log(element.id(), format!("{} '{}' is sick: {}", element.type_name(), element.name(), snapshot.unhealthy_reason));
        }
        Health::Broken => {
            ctx.emit(element.id(), element.name(), NodeEvent::Broken(snapshot.unhealthy_reason.clone()));
            ctx.emit_log(element.id(), format!("{} '{}' is broken: {}", element.type_name(), element.name(), snapshot.unhealthy_reason));
        }
    }
}
