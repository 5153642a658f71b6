//! Customer lifecycle.
//!
//! Entering → (Queueing | Walking) → Seated → Ordering → WaitingFood
//!          → Eating → Paying → Leaving
//!
//! RULE: Leaving is terminal and reachable from every state.
//! A customer mutates only itself; tables, litter and ratings are
//! handled by the coordinator from the returned outcomes.

use crate::{
    rng::SubsystemRng,
    types::{CustomerId, TableId, Vec2},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomerState {
    Entering,
    Queueing,
    Walking,
    Seated,
    Ordering,
    WaitingFood,
    Eating,
    Paying,
    Leaving,
}

impl CustomerState {
    fn is_moving(self) -> bool {
        matches!(
            self,
            CustomerState::Entering
                | CustomerState::Queueing
                | CustomerState::Walking
                | CustomerState::Leaving
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomerAction {
    TakeOrder,
    ServeFood,
    Checkout,
}

/// Rates a customer reads each tick.
#[derive(Debug, Clone, Copy)]
pub struct CustomerContext {
    /// Global patience-decay multiplier (upgrades × event).
    pub patience_decay: f64,
    /// Extra decay per litter item on the floor.
    pub litter_penalty: f64,
    pub litter_count: usize,
    /// Applied only while queueing.
    pub queue_patience: f64,
    /// Base decay while paying, stress already included.
    pub pay_decay: f64,
}

impl Default for CustomerContext {
    fn default() -> Self {
        Self {
            patience_decay: 1.0,
            litter_penalty: 0.05,
            litter_count: 0,
            queue_patience: 1.0,
            pay_decay: 5.0,
        }
    }
}

/// What the serving worker brings to an interaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceContext {
    /// Eat duration if this interaction serves food.
    pub eat_time: f64,
    /// (chance, multiplier) when the server can cook golden food.
    pub golden_food: Option<(f64, f64)>,
    /// Extra tip fraction granted at checkout.
    pub tip_bonus: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InteractionOutcome {
    OrderTaken,
    FoodServed { value_multiplier: f64 },
    Paid(Payment),
}

/// Everything the ledger needs to price a checkout.
#[derive(Debug, Clone, PartialEq)]
pub struct Payment {
    pub rating: u8,
    pub patience: f64,
    pub position: Vec2,
    pub served_by_automation: bool,
    pub tip_bonus: f64,
    pub value_multiplier: f64,
    pub departure: Departure,
}

/// Emitted once when a customer turns to leave.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Departure {
    pub customer: CustomerId,
    pub rating: u8,
    pub happy: bool,
    pub table: Option<TableId>,
    pub position: Vec2,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Customer {
    pub id: CustomerId,
    pub state: CustomerState,
    pub position: Vec2,
    pub target: Vec2,
    pub speed: f64,
    pub patience: f64,
    pub max_patience: f64,
    pub table: Option<TableId>,
    seat: Option<Vec2>,
    exit: Vec2,
    pub queue_index: Option<usize>,
    pub timer: f64,
    order_time: f64,
    pub needs_service: bool,
    pub served_by_automation: bool,
    /// Golden-food multiplier carried from serving to checkout.
    pub value_multiplier: f64,
    pub rating: Option<u8>,
    rating_taken: bool,
    /// Seconds an automated server has spent on this order.
    pub automation_timer: f64,
}

/// Rating bucket for a patience value on a normal departure.
pub fn rating_for(patience: f64) -> u8 {
    if patience >= 80.0 {
        5
    } else if patience >= 50.0 {
        4
    } else if patience >= 20.0 {
        3
    } else {
        2
    }
}

impl Customer {
    /// A new arrival outside the door, heading in.
    pub fn arrive(id: CustomerId, door: Vec2, exit: Vec2, speed: f64, max_patience: f64, order_time: f64) -> Self {
        Self {
            id,
            state: CustomerState::Entering,
            position: exit,
            target: door,
            speed,
            patience: max_patience,
            max_patience,
            table: None,
            seat: None,
            exit,
            queue_index: None,
            timer: 0.0,
            order_time: order_time.max(0.0),
            needs_service: false,
            served_by_automation: false,
            value_multiplier: 1.0,
            rating: None,
            rating_taken: false,
            automation_timer: 0.0,
        }
    }

    pub fn is_leaving(&self) -> bool {
        self.state == CustomerState::Leaving
    }

    /// True once a leaving customer has walked out of the play area.
    pub fn has_exited(&self) -> bool {
        self.is_leaving() && self.position == self.exit
    }

    /// Join the queue at `index`, standing at `slot`.
    pub fn enqueue(&mut self, index: usize, slot: Vec2) {
        self.state = CustomerState::Queueing;
        self.queue_index = Some(index);
        self.position = slot;
        self.target = slot;
    }

    /// Shift within the queue after someone ahead left it.
    pub fn move_in_queue(&mut self, index: usize, slot: Vec2) {
        if self.state == CustomerState::Queueing {
            self.queue_index = Some(index);
            self.target = slot;
        }
    }

    /// Give this customer a table. Customers already inside walk over
    /// and recover `relief` patience.
    pub fn assign_table(&mut self, table: TableId, seat: Vec2, relief: f64) {
        self.table = Some(table);
        self.seat = Some(seat);
        self.queue_index = None;
        if self.state != CustomerState::Entering {
            self.state = CustomerState::Walking;
            self.target = seat;
            self.patience = (self.patience + relief).min(self.max_patience);
        }
    }

    /// Advance one tick. Returns a departure if patience ran out.
    pub fn update(&mut self, dt: f64, ctx: &CustomerContext) -> Option<Departure> {
        if self.state.is_moving() {
            let (pos, arrived) = self.position.step_toward(self.target, self.speed * dt);
            self.position = pos;
            if arrived {
                self.on_arrival();
            }
        }

        let base = match self.state {
            CustomerState::Queueing | CustomerState::Ordering | CustomerState::WaitingFood => 1.0,
            CustomerState::Seated => 0.5,
            CustomerState::Paying => ctx.pay_decay,
            _ => 0.0,
        };
        if base > 0.0 {
            let mut decay = base * ctx.patience_decay;
            if ctx.litter_count > 0 {
                decay *= 1.0 + ctx.litter_count as f64 * ctx.litter_penalty;
            }
            if self.state == CustomerState::Queueing {
                decay *= ctx.queue_patience;
            }
            self.patience = (self.patience - dt * decay.max(0.0)).max(0.0);
            if self.patience <= 0.0 {
                return self.leave(false);
            }
        }

        match self.state {
            CustomerState::Seated => {
                self.timer -= dt;
                if self.timer <= 0.0 {
                    self.state = CustomerState::Ordering;
                    self.needs_service = true;
                }
            }
            CustomerState::Eating => {
                self.timer -= dt;
                if self.timer <= 0.0 {
                    self.state = CustomerState::Paying;
                    self.needs_service = true;
                }
            }
            _ => {}
        }
        None
    }

    fn on_arrival(&mut self) {
        match self.state {
            CustomerState::Entering => {
                if let Some(seat) = self.seat {
                    self.state = CustomerState::Walking;
                    self.target = seat;
                }
            }
            CustomerState::Walking => {
                self.state = CustomerState::Seated;
                self.timer = self.order_time;
            }
            _ => {}
        }
    }

    /// Staff or automation acting on this customer. Pairs that do not
    /// match the current state are ignored.
    pub fn interact(
        &mut self,
        action: CustomerAction,
        service: &ServiceContext,
        rng: &mut SubsystemRng,
    ) -> Option<InteractionOutcome> {
        match (self.state, action) {
            (CustomerState::Ordering, CustomerAction::TakeOrder) => {
                self.state = CustomerState::WaitingFood;
                self.needs_service = false;
                Some(InteractionOutcome::OrderTaken)
            }
            (CustomerState::WaitingFood, CustomerAction::ServeFood) => {
                self.state = CustomerState::Eating;
                self.timer = service.eat_time.max(0.0);
                if let Some((chance, multiplier)) = service.golden_food {
                    if rng.chance(chance) {
                        self.value_multiplier = multiplier;
                    }
                }
                Some(InteractionOutcome::FoodServed { value_multiplier: self.value_multiplier })
            }
            (CustomerState::Paying, CustomerAction::Checkout) => {
                let rating = rating_for(self.patience);
                let patience = self.patience;
                let position = self.position;
                let departure = self.leave(true)?;
                Some(InteractionOutcome::Paid(Payment {
                    rating,
                    patience,
                    position,
                    served_by_automation: self.served_by_automation,
                    tip_bonus: service.tip_bonus,
                    value_multiplier: self.value_multiplier,
                    departure,
                }))
            }
            _ => None,
        }
    }

    /// Serve food without staff. The eventual rating is halved.
    pub fn serve_by_automation(&mut self, eat_time: f64, rng: &mut SubsystemRng) -> bool {
        let service = ServiceContext { eat_time, ..Default::default() };
        let served = self.interact(CustomerAction::ServeFood, &service, rng).is_some();
        if served {
            self.served_by_automation = true;
            self.automation_timer = 0.0;
        }
        served
    }

    /// Head for the exit. Returns None if already leaving.
    pub fn leave(&mut self, happy: bool) -> Option<Departure> {
        if self.is_leaving() {
            return None;
        }
        let rating = if happy { rating_for(self.patience) } else { 1 };
        self.rating = Some(rating);
        self.state = CustomerState::Leaving;
        self.target = self.exit;
        self.needs_service = false;
        self.queue_index = None;
        self.seat = None;
        Some(Departure {
            customer: self.id,
            rating,
            happy,
            table: self.table.take(),
            position: self.position,
        })
    }

    /// The rating to record for this visit, exactly once. Automation-served
    /// visits are halved (floor).
    pub fn take_rating(&mut self) -> Option<u8> {
        if self.rating_taken {
            return None;
        }
        let rating = self.rating?;
        self.rating_taken = true;
        Some(if self.served_by_automation { rating / 2 } else { rating })
    }

    pub fn heal(&mut self, amount: f64) {
        self.patience = (self.patience + amount).min(self.max_patience);
    }
}
