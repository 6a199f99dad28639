//! HasOne Relationship - the far row holds the foreign key, at most one per key

use super::has_many::far_foreign_key;
use super::relationship::{RelationPlan, Relationship};
use super::types::RelationshipType;
use crate::error::ModelResult;

pub(crate) fn plan(plan: RelationPlan<'_>) -> ModelResult<Relationship> {
    let local_key = plan.near_owner_key()?;
    let foreign_key = far_foreign_key(&plan);
    let far_column = format!("{}.{}", plan.far.name(), foreign_key);

    Ok(Relationship::new(
        RelationshipType::HasOne,
        plan.far,
        far_column,
        local_key,
        foreign_key,
    ))
}
