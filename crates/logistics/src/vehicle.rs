//! Fleet vehicles: registration, operational status and maintenance plans.

use core::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use flowgic_core::{Aggregate, AggregateId, AggregateRoot, CompanyId, DomainError, UserId};
use flowgic_events::Event;

/// Stream type tag for vehicle event streams.
pub const VEHICLE_AGGREGATE_TYPE: &str = "logistics.vehicle";

/// Wire format of maintenance dates.
pub const MAINTENANCE_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleId(pub AggregateId);

impl VehicleId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for VehicleId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleStatus {
    Available,
    InTrip,
    Maintenance,
    Blocked,
}

impl VehicleStatus {
    pub const ALL: [VehicleStatus; 4] = [
        VehicleStatus::Available,
        VehicleStatus::InTrip,
        VehicleStatus::Maintenance,
        VehicleStatus::Blocked,
    ];

    pub fn code(self) -> &'static str {
        match self {
            VehicleStatus::Available => "available",
            VehicleStatus::InTrip => "in_trip",
            VehicleStatus::Maintenance => "maintenance",
            VehicleStatus::Blocked => "blocked",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            VehicleStatus::Available => "Available",
            VehicleStatus::InTrip => "In trip",
            VehicleStatus::Maintenance => "Maintenance",
            VehicleStatus::Blocked => "Blocked",
        }
    }

    pub fn css_class(self) -> String {
        format!("status-{}", self.code())
    }
}

impl FromStr for VehicleStatus {
    type Err = DomainError;

    /// Blank and unknown codes are both rejected as invalid.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.code() == code)
            .ok_or_else(|| DomainError::validation("Invalid status"))
    }
}

/// Parse a maintenance date submitted as `YYYY-MM-DD`.
pub fn parse_maintenance_date(raw: &str) -> Result<NaiveDate, DomainError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(DomainError::validation("Date is required"));
    }
    NaiveDate::parse_from_str(raw, MAINTENANCE_DATE_FORMAT)
        .map_err(|_| DomainError::validation("Invalid date format (YYYY-MM-DD)"))
}

/// Registration data of a vehicle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleSpec {
    pub reg_number: String,
    #[serde(default)]
    pub vehicle_type: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub capacity_kg: u32,
}

impl VehicleSpec {
    fn validate(&self) -> Result<(), DomainError> {
        if self.reg_number.trim().is_empty() {
            return Err(DomainError::validation("reg_number is required"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vehicle {
    id: VehicleId,
    company_id: Option<CompanyId>,
    spec: VehicleSpec,
    status: VehicleStatus,
    last_maintenance: Option<NaiveDate>,
    maintenance_note: Option<String>,
    version: u64,
    created: bool,
}

impl Vehicle {
    pub fn empty(id: VehicleId) -> Self {
        Self {
            id,
            company_id: None,
            spec: VehicleSpec::default(),
            status: VehicleStatus::Available,
            last_maintenance: None,
            maintenance_note: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> VehicleId {
        self.id
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn company_id(&self) -> Option<CompanyId> {
        self.company_id
    }

    pub fn spec(&self) -> &VehicleSpec {
        &self.spec
    }

    pub fn status(&self) -> VehicleStatus {
        self.status
    }

    pub fn last_maintenance(&self) -> Option<NaiveDate> {
        self.last_maintenance
    }

    pub fn maintenance_note(&self) -> Option<&str> {
        self.maintenance_note.as_deref()
    }
}

impl AggregateRoot for Vehicle {
    type Id = VehicleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterVehicle {
    pub company_id: CompanyId,
    pub vehicle_id: VehicleId,
    pub spec: VehicleSpec,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// `status` is the raw code as submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeVehicleStatus {
    pub company_id: CompanyId,
    pub vehicle_id: VehicleId,
    pub status: String,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// `date` is the raw `YYYY-MM-DD` form value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanMaintenance {
    pub company_id: CompanyId,
    pub vehicle_id: VehicleId,
    pub date: String,
    pub note: String,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleCommand {
    RegisterVehicle(RegisterVehicle),
    ChangeVehicleStatus(ChangeVehicleStatus),
    PlanMaintenance(PlanMaintenance),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleRegistered {
    pub company_id: CompanyId,
    pub vehicle_id: VehicleId,
    pub spec: VehicleSpec,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleStatusChanged {
    pub company_id: CompanyId,
    pub vehicle_id: VehicleId,
    pub old_status: VehicleStatus,
    pub new_status: VehicleStatus,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenancePlanned {
    pub company_id: CompanyId,
    pub vehicle_id: VehicleId,
    pub date: NaiveDate,
    pub note: String,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleEvent {
    VehicleRegistered(VehicleRegistered),
    VehicleStatusChanged(VehicleStatusChanged),
    MaintenancePlanned(MaintenancePlanned),
}

impl Event for VehicleEvent {
    fn event_type(&self) -> &'static str {
        match self {
            VehicleEvent::VehicleRegistered(_) => "logistics.vehicle.registered",
            VehicleEvent::VehicleStatusChanged(_) => "logistics.vehicle.status_changed",
            VehicleEvent::MaintenancePlanned(_) => "logistics.vehicle.maintenance_planned",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            VehicleEvent::VehicleRegistered(e) => e.occurred_at,
            VehicleEvent::VehicleStatusChanged(e) => e.occurred_at,
            VehicleEvent::MaintenancePlanned(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Vehicle {
    type Command = VehicleCommand;
    type Event = VehicleEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            VehicleEvent::VehicleRegistered(e) => {
                self.id = e.vehicle_id;
                self.company_id = Some(e.company_id);
                self.spec = e.spec.clone();
                self.status = VehicleStatus::Available;
                self.created = true;
            }
            VehicleEvent::VehicleStatusChanged(e) => {
                self.status = e.new_status;
            }
            VehicleEvent::MaintenancePlanned(e) => {
                self.last_maintenance = Some(e.date);
                self.maintenance_note = Some(e.note.clone()).filter(|n| !n.is_empty());
            }
        }
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            VehicleCommand::RegisterVehicle(cmd) => self.handle_register(cmd),
            VehicleCommand::ChangeVehicleStatus(cmd) => self.handle_change_status(cmd),
            VehicleCommand::PlanMaintenance(cmd) => self.handle_plan_maintenance(cmd),
        }
    }
}

impl Vehicle {
    fn ensure_existing(&self, company_id: CompanyId, vehicle_id: VehicleId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.company_id != Some(company_id) {
            return Err(DomainError::invariant("company mismatch"));
        }
        if self.id != vehicle_id {
            return Err(DomainError::invariant("vehicle_id mismatch"));
        }
        Ok(())
    }

    fn handle_register(&self, cmd: &RegisterVehicle) -> Result<Vec<VehicleEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("vehicle already exists"));
        }
        cmd.spec.validate()?;

        let mut spec = cmd.spec.clone();
        spec.reg_number = spec.reg_number.trim().to_string();

        Ok(vec![VehicleEvent::VehicleRegistered(VehicleRegistered {
            company_id: cmd.company_id,
            vehicle_id: cmd.vehicle_id,
            spec,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    /// Re-submitting the current status succeeds without recording anything.
    fn handle_change_status(&self, cmd: &ChangeVehicleStatus) -> Result<Vec<VehicleEvent>, DomainError> {
        self.ensure_existing(cmd.company_id, cmd.vehicle_id)?;

        let new_status: VehicleStatus = cmd.status.parse()?;
        if new_status == self.status {
            return Ok(vec![]);
        }

        Ok(vec![VehicleEvent::VehicleStatusChanged(VehicleStatusChanged {
            company_id: cmd.company_id,
            vehicle_id: cmd.vehicle_id,
            old_status: self.status,
            new_status,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_plan_maintenance(&self, cmd: &PlanMaintenance) -> Result<Vec<VehicleEvent>, DomainError> {
        self.ensure_existing(cmd.company_id, cmd.vehicle_id)?;
        let date = parse_maintenance_date(&cmd.date)?;

        Ok(vec![VehicleEvent::MaintenancePlanned(MaintenancePlanned {
            company_id: cmd.company_id,
            vehicle_id: cmd.vehicle_id,
            date,
            note: cmd.note.trim().to_string(),
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }
}
