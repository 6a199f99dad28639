//! HasAndBelongsToMany Relationship - many-to-many through an association table
//!
//! The far query joins the association table and reports the near key of
//! each row under a pivot alias, which `find` uses for grouping and strips
//! before hydration.

use super::relationship::{RelationPlan, Relationship, PIVOT_KEY};
use super::types::{Association, RelationshipType};
use crate::error::{ModelError, ModelResult};
use crate::inflector::foreign_key_for;

/// Association table for two tables: both names sorted and joined with `_`
pub fn association_table_name(near_table: &str, far_table: &str) -> String {
    let mut tables = [near_table, far_table];
    tables.sort_unstable();
    tables.join("_")
}

pub(crate) fn plan(plan: RelationPlan<'_>) -> ModelResult<Relationship> {
    let local_key = plan.near_owner_key()?;
    let far_primary_key = plan.far.primary_key().as_single().map(str::to_string).ok_or_else(|| {
        ModelError::Relationship(format!(
            "cannot infer keys for relation '{}': table '{}' needs a single-column primary key",
            plan.def.name,
            plan.far.name()
        ))
    })?;

    let table = plan
        .def
        .association_table
        .clone()
        .unwrap_or_else(|| association_table_name(plan.near_table, plan.far.name()));
    let (near_key, far_key) = plan.def.association_keys.clone().unwrap_or_else(|| {
        (
            foreign_key_for(plan.near_class),
            foreign_key_for(plan.def.target.class_name),
        )
    });

    let far_table = plan.far.name().to_string();
    let pivot_column = format!("{}.{}", table, near_key);
    let query = plan
        .far
        .columns([
            format!("{}.*", far_table),
            format!("{} AS {}", pivot_column, PIVOT_KEY),
        ])
        .join(
            &table,
            &format!("{}.{}", table, far_key),
            &format!("{}.{}", far_table, far_primary_key),
        );

    let mut relationship = Relationship::new(
        RelationshipType::HasAndBelongsToMany,
        query,
        pivot_column,
        local_key,
        PIVOT_KEY.to_string(),
    );
    relationship.association = Some(Association {
        table,
        near_key,
        far_key,
    });
    Ok(relationship)
}
