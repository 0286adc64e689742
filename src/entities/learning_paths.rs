use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "learning_paths")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    #[sea_orm(column_type = "Decimal(Some((18, 2)))")]
    pub price: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::learning_path_courses::Entity")]
    PathCourses,
}

impl Related<super::learning_path_courses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PathCourses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
