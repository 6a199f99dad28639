//! HasMany Relationship - far rows hold the foreign key
//!
//! `projects.id <- users.project_id`: keys come from the near primary key
//! and are matched against the far foreign key column.

use super::relationship::{RelationPlan, Relationship};
use super::types::RelationshipType;
use crate::error::ModelResult;
use crate::inflector::foreign_key_for;

/// Foreign key on the far table, named after the near entity unless declared
pub(super) fn far_foreign_key(plan: &RelationPlan<'_>) -> String {
    plan.def
        .foreign_key
        .clone()
        .unwrap_or_else(|| foreign_key_for(plan.near_class))
}

pub(crate) fn plan(plan: RelationPlan<'_>) -> ModelResult<Relationship> {
    let local_key = plan.near_owner_key()?;
    let foreign_key = far_foreign_key(&plan);
    let far_column = format!("{}.{}", plan.far.name(), foreign_key);

    Ok(Relationship::new(
        RelationshipType::HasMany,
        plan.far,
        far_column,
        local_key,
        foreign_key,
    ))
}
