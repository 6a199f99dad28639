//! BelongsTo Relationship - the near row holds the foreign key
//!
//! `users.project_id -> projects.id`: keys come from the near record's
//! foreign key column and are matched against the far primary key.

use super::relationship::{RelationPlan, Relationship};
use super::types::RelationshipType;
use crate::error::ModelResult;
use crate::inflector::foreign_key_for;

pub(crate) fn plan(plan: RelationPlan<'_>) -> ModelResult<Relationship> {
    let foreign_key = plan
        .def
        .foreign_key
        .clone()
        .unwrap_or_else(|| foreign_key_for(plan.def.target.class_name));
    let owner_key = plan.far_owner_key()?;
    let far_column = format!("{}.{}", plan.far.name(), owner_key);

    Ok(Relationship::new(
        RelationshipType::BelongsTo,
        plan.far,
        far_column,
        foreign_key,
        owner_key,
    ))
}
