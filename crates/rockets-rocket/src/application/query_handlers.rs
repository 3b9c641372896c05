//! Query handlers for the Rocket context.
//!
//! Queries go through plain dispatch: they never mutate, so they take no lock.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rockets_bus::{Bus, Handler, HandlerError};
use rockets_core::message::Message;
use serde::Serialize;

use crate::domain::aggregates::Rocket;
use crate::domain::repository::{RocketRepository, SortKey};
use crate::domain::value_objects::RocketId;

/// Type discriminant of [`FindRocketById`].
pub const FIND_ROCKET_BY_ID_QUERY_TYPE: &str = "find_rocket_by_id_query";
/// Type discriminant of [`SearchRockets`].
pub const SEARCH_ROCKETS_QUERY_TYPE: &str = "search_rockets_query";

/// Loads one live rocket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindRocketById {
    /// Raw rocket id, validated by the handler.
    pub rocket_id: String,
}

/// Lists live rockets in the requested order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchRockets {
    /// Result ordering.
    pub sort: SortKey,
}

/// Read-side messages of the Rocket context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RocketQuery {
    /// See [`FindRocketById`].
    FindById(FindRocketById),
    /// See [`SearchRockets`].
    Search(SearchRockets),
}

impl Message for RocketQuery {
    fn message_type(&self) -> &'static str {
        match self {
            Self::FindById(_) => FIND_ROCKET_BY_ID_QUERY_TYPE,
            Self::Search(_) => SEARCH_ROCKETS_QUERY_TYPE,
        }
    }
}

/// Read model of a live rocket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RocketView {
    /// Rocket id.
    pub id: String,
    /// Rocket model.
    #[serde(rename = "type")]
    pub rocket_type: String,
    /// Current speed.
    pub launch_speed: i64,
    /// Current mission.
    pub mission: String,
    /// Launch time.
    pub created_at: DateTime<Utc>,
    /// Time of the last applied event.
    pub updated_at: DateTime<Utc>,
}

impl From<&Rocket> for RocketView {
    fn from(rocket: &Rocket) -> Self {
        let p = rocket.primitives();
        Self {
            id: p.id,
            rocket_type: p.rocket_type,
            launch_speed: p.launch_speed,
            mission: p.mission,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

/// Output of the query bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RocketQueryResponse {
    /// A single rocket.
    Rocket(RocketView),
    /// An ordered list of rockets.
    Rockets(Vec<RocketView>),
}

impl TryFrom<RocketQueryResponse> for RocketView {
    type Error = RocketQueryResponse;

    fn try_from(response: RocketQueryResponse) -> Result<Self, Self::Error> {
        match response {
            RocketQueryResponse::Rocket(view) => Ok(view),
            other @ RocketQueryResponse::Rockets(_) => Err(other),
        }
    }
}

impl TryFrom<RocketQueryResponse> for Vec<RocketView> {
    type Error = RocketQueryResponse;

    fn try_from(response: RocketQueryResponse) -> Result<Self, Self::Error> {
        match response {
            RocketQueryResponse::Rockets(views) => Ok(views),
            other @ RocketQueryResponse::Rocket(_) => Err(other),
        }
    }
}

/// Builds the query bus.
///
/// # Panics
///
/// Panics if two handlers claim the same query type, which is a wiring bug.
#[must_use]
pub fn query_bus(repository: Arc<dyn RocketRepository>) -> Bus<RocketQuery, RocketQueryResponse> {
    Bus::<RocketQuery, RocketQueryResponse>::new()
        .must_register(
            FIND_ROCKET_BY_ID_QUERY_TYPE,
            Arc::new(FindRocketByIdHandler::new(Arc::clone(&repository))),
        )
        .must_register(
            SEARCH_ROCKETS_QUERY_TYPE,
            Arc::new(SearchRocketsHandler::new(repository)),
        )
}

/// Answers [`FindRocketById`].
pub struct FindRocketByIdHandler {
    repository: Arc<dyn RocketRepository>,
}

impl FindRocketByIdHandler {
    /// Creates the handler.
    #[must_use]
    pub fn new(repository: Arc<dyn RocketRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl Handler<RocketQuery, RocketQueryResponse> for FindRocketByIdHandler {
    async fn handle(&self, query: RocketQuery) -> Result<RocketQueryResponse, HandlerError> {
        let RocketQuery::FindById(find) = &query else {
            return Err(HandlerError::UnexpectedInput(query.message_type()));
        };
        let id = RocketId::new(&find.rocket_id)?;
        let rocket = self.repository.find(&id).await?;
        Ok(RocketQueryResponse::Rocket(RocketView::from(&rocket)))
    }
}

/// Answers [`SearchRockets`].
pub struct SearchRocketsHandler {
    repository: Arc<dyn RocketRepository>,
}

impl SearchRocketsHandler {
    /// Creates the handler.
    #[must_use]
    pub fn new(repository: Arc<dyn RocketRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl Handler<RocketQuery, RocketQueryResponse> for SearchRocketsHandler {
    async fn handle(&self, query: RocketQuery) -> Result<RocketQueryResponse, HandlerError> {
        let RocketQuery::Search(search) = &query else {
            return Err(HandlerError::UnexpectedInput(query.message_type()));
        };
        let rockets = self.repository.search(search.sort).await?;
        Ok(RocketQueryResponse::Rockets(
            rockets.iter().map(RocketView::from).collect(),
        ))
    }
}
