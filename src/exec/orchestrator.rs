//! Descriptor-to-datastore dispatch and admission policy.

use crate::datastore::{Datastore, EntityStream};
use crate::query::{EntityKind, QueryDescriptor};

use super::errors::{ExecError, ExecResult};

/// Values-only execution policy, loaded elsewhere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecPolicy {
    /// Maximum summed bounding box area, in square degrees. Inclusive:
    /// a query exactly at the maximum is admitted.
    pub max_bbox_area: f64,
}

impl Default for ExecPolicy {
    fn default() -> Self {
        Self {
            max_bbox_area: 100.0,
        }
    }
}

/// Cross-cutting checks that are not expressible in grammar terms.
///
/// Runs before any datastore call: a rejected query consumes no
/// datastore resources.
pub fn validate(descriptor: &QueryDescriptor, policy: &ExecPolicy) -> ExecResult<()> {
    if descriptor.selector_count() == 0 {
        return Err(ExecError::NoSelectors);
    }
    let area = descriptor.total_bbox_area();
    if area > policy.max_bbox_area {
        return Err(ExecError::AreaLimitExceeded {
            area,
            max: policy.max_bbox_area,
        });
    }
    Ok(())
}

/// Dispatches the descriptor to the matching iteration capability.
///
/// The returned sequence is lazy, single-pass and forward-only; once
/// consumed it cannot be re-iterated without re-invoking the datastore.
pub fn open_stream<'a>(
    descriptor: &QueryDescriptor,
    datastore: &'a dyn Datastore,
) -> ExecResult<Box<dyn EntityStream + Send + 'a>> {
    let bboxes = descriptor.bbox_selectors();
    let selectors = descriptor.other_selectors();
    let stream = match descriptor.kind() {
        EntityKind::Node => datastore.iterate_nodes(bboxes, selectors)?,
        EntityKind::Way => datastore.iterate_ways(bboxes, selectors)?,
        EntityKind::Relation => datastore.iterate_relations(bboxes, selectors)?,
        EntityKind::AnyPrimitive => datastore.iterate_all_primitives(bboxes, selectors)?,
        EntityKind::MapExtract => {
            // The extract returns raw box contents; selectors do not apply.
            let Some(bbox) = bboxes.first() else {
                return Err(ExecError::Unsupported(
                    "map extract requires a bounding box".to_string(),
                ));
            };
            let b = bbox.bounds();
            datastore.iterate_bounding_box(b.left(), b.right(), b.top(), b.bottom(), true)?
        }
    };
    Ok(stream)
}

/// Validates and opens in one step.
pub fn execute<'a>(
    descriptor: &QueryDescriptor,
    datastore: &'a dyn Datastore,
    policy: &ExecPolicy,
) -> ExecResult<Box<dyn EntityStream + Send + 'a>> {
    validate(descriptor, policy)?;
    open_stream(descriptor, datastore)
}
