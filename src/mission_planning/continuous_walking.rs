//! Continuous walking
//!
//! Drives the footstep planner while the robot is already walking. The
//! planner replans whenever a new step starts, hands a few steps at a time
//! to the controller through a [`PlanSlot`] and then waits for the next
//! touchdown.
//!
//! ```text
//! NotStarted --[PlanFound]--> PlanAvailable --[PlanSent]--> WaitingToLand
//!                                   ^                            |
//!                                   |                    [FootstepStarted]
//!                                   |                            v
//!                                   +-------[PlanFound]----- ReadyToPlan
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::common::{PlannerError, PlannerResult};
use crate::footstep_planning::{FootstepGraphSearchEngine, FootstepPlan, PlanSlot, PlannerRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WalkingState {
    NotStarted,
    ReadyToPlan,
    PlanAvailable,
    WaitingToLand,
}

impl fmt::Display for WalkingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WalkingState::NotStarted => "not_started",
            WalkingState::ReadyToPlan => "ready_to_plan",
            WalkingState::PlanAvailable => "plan_available",
            WalkingState::WaitingToLand => "waiting_to_land",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WalkingEvent {
    PlanFound,
    NoPlan,
    PlanSent,
    FootstepStarted,
    Disabled,
}

impl fmt::Display for WalkingEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WalkingEvent::PlanFound => "plan_found",
            WalkingEvent::NoPlan => "no_plan",
            WalkingEvent::PlanSent => "plan_sent",
            WalkingEvent::FootstepStarted => "footstep_started",
            WalkingEvent::Disabled => "disabled",
        };
        write!(f, "{}", name)
    }
}

/// Footstep progress reported by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FootstepStatus {
    Started,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContinuousWalkingConfig {
    /// Steps handed to the controller per plan
    pub max_steps_to_send: usize,
}

impl Default for ContinuousWalkingConfig {
    fn default() -> Self {
        Self { max_steps_to_send: 3 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkingStatistics {
    pub plans_generated: usize,
    pub plans_sent: usize,
    pub empty_plans: usize,
    pub steps_started: usize,
    pub steps_completed: usize,
}

pub struct ContinuousWalkingPlanner {
    engine: FootstepGraphSearchEngine,
    slot: Arc<PlanSlot>,
    config: ContinuousWalkingConfig,
    state: WalkingState,
    enabled: bool,
    transitions: HashMap<(WalkingState, WalkingEvent), WalkingState>,
    transition_history: Vec<(WalkingState, WalkingEvent, WalkingState)>,
    latest_plan: Option<FootstepPlan>,
    statistics: WalkingStatistics,
}

impl ContinuousWalkingPlanner {
    pub fn new(engine: FootstepGraphSearchEngine, config: ContinuousWalkingConfig) -> PlannerResult<Self> {
        if config.max_steps_to_send == 0 {
            return Err(PlannerError::InvalidParameter(
                "max_steps_to_send must be positive".to_string(),
            ));
        }

        use WalkingEvent::*;
        use WalkingState::*;
        let mut transitions = HashMap::new();
        transitions.insert((NotStarted, PlanFound), PlanAvailable);
        transitions.insert((ReadyToPlan, PlanFound), PlanAvailable);
        transitions.insert((ReadyToPlan, NoPlan), WaitingToLand);
        transitions.insert((PlanAvailable, PlanSent), WaitingToLand);
        transitions.insert((WaitingToLand, FootstepStarted), ReadyToPlan);
        for state in [ReadyToPlan, PlanAvailable, WaitingToLand] {
            transitions.insert((state, Disabled), NotStarted);
        }

        Ok(Self {
            engine,
            slot: Arc::new(PlanSlot::new()),
            config,
            state: NotStarted,
            enabled: true,
            transitions,
            transition_history: Vec::new(),
            latest_plan: None,
            statistics: WalkingStatistics::default(),
        })
    }

    pub fn state(&self) -> WalkingState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Slot the controller reads plans from
    pub fn plan_slot(&self) -> Arc<PlanSlot> {
        Arc::clone(&self.slot)
    }

    pub fn engine(&self) -> &FootstepGraphSearchEngine {
        &self.engine
    }

    pub fn transition_history(&self) -> &[(WalkingState, WalkingEvent, WalkingState)] {
        &self.transition_history
    }

    pub fn statistics(&self) -> &WalkingStatistics {
        &self.statistics
    }

    fn process(&mut self, event: WalkingEvent) -> PlannerResult<()> {
        let next = self
            .transitions
            .get(&(self.state, event))
            .copied()
            .ok_or_else(|| {
                PlannerError::Planning(format!("invalid transition: <{}> : [{}]", self.state, event))
            })?;
        debug!("Continuous walking: <{}> -> <{}> on [{}]", self.state, next, event);
        self.transition_history.push((self.state, event, next));
        self.state = next;
        Ok(())
    }

    /// Advance the state machine once
    ///
    /// Returns the plan handed to the controller, if this tick sent one.
    pub fn tick(&mut self, request: &PlannerRequest) -> PlannerResult<Option<FootstepPlan>> {
        if !self.enabled {
            return Ok(None);
        }

        match self.state {
            WalkingState::NotStarted => {
                self.engine.reset();
                let plan = self.engine.generate_plan(request)?;
                self.statistics.plans_generated += 1;
                if plan.is_empty() {
                    self.statistics.empty_plans += 1;
                } else {
                    self.latest_plan = Some(plan);
                    self.process(WalkingEvent::PlanFound)?;
                }
                Ok(None)
            }
            WalkingState::ReadyToPlan => {
                let plan = self.engine.generate_plan(request)?;
                self.statistics.plans_generated += 1;
                if plan.is_empty() {
                    self.statistics.empty_plans += 1;
                    self.process(WalkingEvent::NoPlan)?;
                } else {
                    self.latest_plan = Some(plan);
                    self.process(WalkingEvent::PlanFound)?;
                }
                Ok(None)
            }
            WalkingState::PlanAvailable => {
                let plan = self
                    .latest_plan
                    .as_ref()
                    .map(|p| p.limited(self.config.max_steps_to_send))
                    .unwrap_or_default();
                self.slot.publish(plan.clone());
                self.statistics.plans_sent += 1;
                info!("Sent {} footsteps to the controller", plan.len());
                self.process(WalkingEvent::PlanSent)?;
                Ok(Some(plan))
            }
            WalkingState::WaitingToLand => Ok(None),
        }
    }

    pub fn on_footstep_status(&mut self, status: FootstepStatus) -> PlannerResult<()> {
        match status {
            FootstepStatus::Started => {
                self.process(WalkingEvent::FootstepStarted)?;
                self.statistics.steps_started += 1;
            }
            FootstepStatus::Completed => self.statistics.steps_completed += 1,
        }
        Ok(())
    }

    /// Disabling stops planning, drops the search and returns to `NotStarted`
    pub fn set_enabled(&mut self, enabled: bool) -> PlannerResult<()> {
        if !enabled && self.state != WalkingState::NotStarted {
            self.process(WalkingEvent::Disabled)?;
        }
        if !enabled {
            self.engine.reset();
            self.latest_plan = None;
        }
        self.enabled = enabled;
        Ok(())
    }
}
