//! Event handlers for the Rocket context.
//!
//! Each handler turns one kind of [`RocketEvent`] into a creator or updater
//! call. [`event_bus`] wires all of them into the bus used for blocking
//! dispatch.

use std::sync::Arc;

use async_trait::async_trait;
use rockets_bus::{Bus, Handler, HandlerError};
use rockets_core::error::DomainError;
use rockets_core::message::Message;

use crate::domain::aggregates::GuardPolicy;
use crate::domain::events::{
    ROCKET_EXPLODED_EVENT_TYPE, ROCKET_LAUNCHED_EVENT_TYPE, ROCKET_MISSION_CHANGED_EVENT_TYPE,
    ROCKET_SPEED_DECREASED_EVENT_TYPE, ROCKET_SPEED_INCREASED_EVENT_TYPE, RocketEvent,
    RocketEventKind,
};
use crate::domain::repository::RocketRepository;
use crate::domain::services::{CreateRocketParams, RocketCreator, RocketUpdate, RocketUpdater};

/// Builds the event bus with every rocket event handler registered.
///
/// # Panics
///
/// Panics if two handlers claim the same event type, which is a wiring bug.
#[must_use]
pub fn event_bus(repository: Arc<dyn RocketRepository>, guard: GuardPolicy) -> Bus<RocketEvent, ()> {
    let creator = RocketCreator::new(Arc::clone(&repository));
    let updater = RocketUpdater::new(repository, guard);
    let params_changed = Arc::new(UpdateRocketOnRocketParamsChanged::new(updater.clone()));

    Bus::<RocketEvent, ()>::new()
        .must_register(
            ROCKET_LAUNCHED_EVENT_TYPE,
            Arc::new(CreateRocketOnRocketLaunched::new(creator)),
        )
        .must_register(
            ROCKET_EXPLODED_EVENT_TYPE,
            Arc::new(DeleteRocketOnRocketExploded::new(updater)),
        )
        .must_register(ROCKET_MISSION_CHANGED_EVENT_TYPE, params_changed.clone())
        .must_register(ROCKET_SPEED_INCREASED_EVENT_TYPE, params_changed.clone())
        .must_register(ROCKET_SPEED_DECREASED_EVENT_TYPE, params_changed)
}

/// Creates the rocket announced by `RocketLaunched`.
#[derive(Debug)]
pub struct CreateRocketOnRocketLaunched {
    creator: RocketCreator,
}

impl CreateRocketOnRocketLaunched {
    /// Creates the handler.
    #[must_use]
    pub fn new(creator: RocketCreator) -> Self {
        Self { creator }
    }
}

#[async_trait]
impl Handler<RocketEvent, ()> for CreateRocketOnRocketLaunched {
    async fn handle(&self, event: RocketEvent) -> Result<(), HandlerError> {
        let RocketEventKind::Launched(launched) = &event.kind else {
            return Err(HandlerError::UnexpectedInput(event.message_type()));
        };
        let at = event.metadata.occurred_at.ok_or_else(|| {
            DomainError::Validation("rocket launch requires a message time".into())
        })?;

        self.creator
            .create(CreateRocketParams {
                id: event.metadata.rocket_id.clone(),
                rocket_type: launched.rocket_type.clone(),
                launch_speed: launched.launch_speed,
                mission: launched.mission.clone(),
                at,
            })
            .await?;
        Ok(())
    }
}

/// Soft-deletes the rocket named by `RocketExploded`.
#[derive(Debug)]
pub struct DeleteRocketOnRocketExploded {
    updater: RocketUpdater,
}

impl DeleteRocketOnRocketExploded {
    /// Creates the handler.
    #[must_use]
    pub fn new(updater: RocketUpdater) -> Self {
        Self { updater }
    }
}

#[async_trait]
impl Handler<RocketEvent, ()> for DeleteRocketOnRocketExploded {
    async fn handle(&self, event: RocketEvent) -> Result<(), HandlerError> {
        if !matches!(event.kind, RocketEventKind::Exploded(_)) {
            return Err(HandlerError::UnexpectedInput(event.message_type()));
        }
        self.updater
            .update(
                &event.metadata.rocket_id,
                vec![RocketUpdate::SoftDeletion {
                    at: event.metadata.occurred_at,
                }],
            )
            .await?;
        Ok(())
    }
}

/// Applies mission and speed changes.
#[derive(Debug)]
pub struct UpdateRocketOnRocketParamsChanged {
    updater: RocketUpdater,
}

impl UpdateRocketOnRocketParamsChanged {
    /// Creates the handler.
    #[must_use]
    pub fn new(updater: RocketUpdater) -> Self {
        Self { updater }
    }
}

#[async_trait]
impl Handler<RocketEvent, ()> for UpdateRocketOnRocketParamsChanged {
    async fn handle(&self, event: RocketEvent) -> Result<(), HandlerError> {
        let at = event.metadata.occurred_at;
        let update = match &event.kind {
            RocketEventKind::MissionChanged(changed) => RocketUpdate::Mission {
                mission: changed.new_mission.clone(),
                at,
            },
            RocketEventKind::SpeedIncreased(increased) => RocketUpdate::LaunchSpeed {
                delta: speed_amount(increased.by)?,
                at,
            },
            RocketEventKind::SpeedDecreased(decreased) => RocketUpdate::LaunchSpeed {
                delta: speed_amount(decreased.by)?.saturating_neg(),
                at,
            },
            RocketEventKind::Launched(_) | RocketEventKind::Exploded(_) => {
                return Err(HandlerError::UnexpectedInput(event.message_type()));
            }
        };

        self.updater
            .update(&event.metadata.rocket_id, vec![update])
            .await?;
        Ok(())
    }
}

/// The direction of a speed change is carried by the event type alone.
fn speed_amount(by: i64) -> Result<i64, DomainError> {
    if by < 0 {
        return Err(DomainError::Validation(format!(
            "speed change amount must not be negative, got {by}"
        )));
    }
    Ok(by)
}
