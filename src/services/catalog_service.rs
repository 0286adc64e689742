use crate::entities::{
    MONEY_SCALE, course_entity as courses, learning_path_entity as paths,
    path_course_entity as path_courses,
};
use crate::error::AppResult;
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseInfo {
    pub title: String,
    pub price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathInfo {
    pub title: String,
    pub price: Decimal,
    /// Constituent courses in path order.
    pub course_ids: Vec<Uuid>,
}

/// Read-only view of the course catalog owned by the catalog service.
#[derive(Clone)]
pub struct CatalogService {
    pool: DatabaseConnection,
}

impl CatalogService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    pub async fn get_course(&self, course_id: Uuid) -> AppResult<Option<CourseInfo>> {
        find_course(&self.pool, course_id).await
    }

    pub async fn get_path(&self, path_id: Uuid) -> AppResult<Option<PathInfo>> {
        find_path(&self.pool, path_id).await
    }
}

pub async fn find_course<C: ConnectionTrait>(
    conn: &C,
    course_id: Uuid,
) -> AppResult<Option<CourseInfo>> {
    let course = courses::Entity::find_by_id(course_id).one(conn).await?;
    Ok(course.map(|c| CourseInfo {
        title: c.title,
        price: c.price.round_dp(MONEY_SCALE),
    }))
}

/// Loads a path together with its current course list. Usable inside a
/// transaction so payment sees the membership at commit time.
pub async fn find_path<C: ConnectionTrait>(conn: &C, path_id: Uuid) -> AppResult<Option<PathInfo>> {
    let Some(path) = paths::Entity::find_by_id(path_id).one(conn).await? else {
        return Ok(None);
    };

    let course_ids = path_courses::Entity::find()
        .filter(path_courses::Column::PathId.eq(path_id))
        .order_by_asc(path_courses::Column::Position)
        .all(conn)
        .await?
        .into_iter()
        .map(|pc| pc.course_id)
        .collect();

    Ok(Some(PathInfo {
        title: path.title,
        price: path.price.round_dp(MONEY_SCALE),
        course_ids,
    }))
}

/// Title of whatever the order points at; `None` when the catalog row is gone.
pub async fn find_item_title<C: ConnectionTrait>(
    conn: &C,
    course_id: Option<Uuid>,
    path_id: Option<Uuid>,
) -> AppResult<Option<String>> {
    if let Some(id) = course_id {
        return Ok(courses::Entity::find_by_id(id)
            .one(conn)
            .await?
            .map(|c| c.title));
    }
    if let Some(id) = path_id {
        return Ok(paths::Entity::find_by_id(id)
            .one(conn)
            .await?
            .map(|p| p.title));
    }
    Ok(None)
}

/// Batch title lookup for order listings.
pub async fn find_titles<C: ConnectionTrait>(
    conn: &C,
    course_ids: Vec<Uuid>,
    path_ids: Vec<Uuid>,
) -> AppResult<(HashMap<Uuid, String>, HashMap<Uuid, String>)> {
    let mut course_titles = HashMap::new();
    if !course_ids.is_empty() {
        for c in courses::Entity::find()
            .filter(courses::Column::Id.is_in(course_ids))
            .all(conn)
            .await?
        {
            course_titles.insert(c.id, c.title);
        }
    }

    let mut path_titles = HashMap::new();
    if !path_ids.is_empty() {
        for p in paths::Entity::find()
            .filter(paths::Column::Id.is_in(path_ids))
            .all(conn)
            .await?
        {
            path_titles.insert(p.id, p.title);
        }
    }

    Ok((course_titles, path_titles))
}
