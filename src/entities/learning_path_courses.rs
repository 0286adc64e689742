use sea_orm::entity::prelude::*;

/// Membership of a course in a learning path. Read at payment time, so a path
/// edited after the order was placed enrolls its current courses.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "learning_path_courses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub path_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub course_id: Uuid,
    pub position: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::learning_paths::Entity",
        from = "Column::PathId",
        to = "super::learning_paths::Column::Id",
        on_delete = "Cascade"
    )]
    LearningPath,
}

impl Related<super::learning_paths::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LearningPath.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
